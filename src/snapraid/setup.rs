//! SnapRAID setup
//!
//! Knows where the SnapRAID executable lives and how to ask it to sync.
//! Execution goes through any [`Runner`], never a concrete process type.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::host::{CommandError, CommandSpec, ExecutionResult, RunOptions, Runner};

/// SnapRAID sub-command that updates parity
pub const SYNC_ARG: &str = "sync";

/// Errors from preparing or running a SnapRAID command
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("SnapRAID executable at {} not found", .0.display())]
    ExecutableNotFound(PathBuf),

    #[error(transparent)]
    Command(#[from] CommandError),
}

/// A SnapRAID installation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapraidSetup {
    executable_path: PathBuf,
}

impl SnapraidSetup {
    pub fn new(executable_path: impl Into<PathBuf>) -> Self {
        Self {
            executable_path: executable_path.into(),
        }
    }

    /// Use `name_or_path` directly if it exists, otherwise look it up in PATH
    pub fn locate(name_or_path: &str) -> Result<Self, SetupError> {
        let path = Path::new(name_or_path);
        if path.exists() {
            return Ok(Self::new(path));
        }
        which::which(name_or_path)
            .map(Self::new)
            .map_err(|_| SetupError::ExecutableNotFound(path.to_path_buf()))
    }

    pub fn executable_path(&self) -> &Path {
        &self.executable_path
    }

    /// Build `[executable, "sync"]`. Fails before anything is spawned if the
    /// executable is missing.
    pub fn prepare_sync_command(&self) -> Result<CommandSpec, SetupError> {
        tracing::info!(
            "Preparing the sync command for SnapRAID `{}`",
            self.executable_path.display()
        );
        if !self.executable_path.exists() {
            return Err(SetupError::ExecutableNotFound(self.executable_path.clone()));
        }
        Ok(CommandSpec::new([
            self.executable_path.as_os_str(),
            OsStr::new(SYNC_ARG),
        ]))
    }

    /// Sync the SnapRAID array
    pub async fn sync<R>(
        &self,
        runner: &R,
        options: &RunOptions,
    ) -> Result<ExecutionResult, SetupError>
    where
        R: Runner + ?Sized,
    {
        let spec = self.prepare_sync_command()?;
        tracing::info!(
            "Syncing the SnapRAID setup `{}`",
            self.executable_path.display()
        );

        match runner.run(&spec, options).await {
            Ok(result) => {
                tracing::info!("SnapRAID sync finished");
                Ok(result)
            }
            Err(e) => {
                if let Some(stderr) = e.stderr() {
                    for line in stderr {
                        tracing::debug!(target: "snapraid::stderr", "{}", line);
                    }
                }
                tracing::error!("SnapRAID sync failed: {}", e);
                Err(e.into())
            }
        }
    }
}
