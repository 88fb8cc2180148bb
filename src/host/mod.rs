//! Host module for process management and command execution

pub mod command_runner;
pub mod events;

pub use command_runner::{
    CommandError, CommandRunner, CommandSpec, ExecutionResult, RunOptions, Runner,
};
pub use events::{tracing_sink, EventSink, OutputStream, RunEvent};
