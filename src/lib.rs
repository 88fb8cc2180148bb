//! snapsync - run SnapRAID sync programmatically
//!
//! The core is [`host::CommandRunner`]: it spawns a process from an argument
//! vector, streams and captures its output, and reports a non-zero exit as
//! a typed error. [`snapraid::SnapraidSetup`] builds the `sync` command on
//! top of any [`host::Runner`].

pub mod cli;
pub mod host;
pub mod logging;
pub mod settings;
pub mod snapraid;

pub use host::{CommandError, CommandRunner, CommandSpec, ExecutionResult, RunOptions, Runner};
pub use snapraid::{SetupError, SnapraidSetup};
