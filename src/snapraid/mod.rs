//! SnapRAID integration

mod setup;

pub use setup::{SetupError, SnapraidSetup, SYNC_ARG};
