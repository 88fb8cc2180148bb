//! Command line interface

pub mod sync;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::host::CommandError;
use crate::settings::SettingsError;
use crate::snapraid::SetupError;

/// Process exit codes
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const UNEXPECTED_FAILURE: i32 = 1;
    /// SnapRAID executable missing or could not be launched
    pub const EXECUTABLE_MISSING: i32 = 2;
    /// SnapRAID ran and exited non-zero
    pub const SYNC_FAILED: i32 = 3;
    pub const CONFIG_ERROR: i32 = 4;
    pub const TIMEOUT: i32 = 5;
}

#[derive(Debug, Parser)]
#[command(name = "snapsync", version, about = "Run SnapRAID sync from scripts and schedulers")]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_output: bool,

    /// Settings file (defaults to the user config directory)
    #[arg(short, long, global = true, env = "SNAPSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Append logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Update parity with `snapraid sync`
    Sync(sync::SyncArgs),
}

/// Map an error to the exit code the binary should return
pub fn categorize_error(e: &anyhow::Error) -> i32 {
    if let Some(setup) = e.downcast_ref::<SetupError>() {
        return match setup {
            SetupError::ExecutableNotFound(_) => exit_codes::EXECUTABLE_MISSING,
            SetupError::Command(cmd) => categorize_command_error(cmd),
        };
    }
    if let Some(cmd) = e.downcast_ref::<CommandError>() {
        return categorize_command_error(cmd);
    }
    if e.downcast_ref::<SettingsError>().is_some() {
        return exit_codes::CONFIG_ERROR;
    }
    exit_codes::UNEXPECTED_FAILURE
}

fn categorize_command_error(e: &CommandError) -> i32 {
    match e {
        CommandError::Spawn { .. } => exit_codes::EXECUTABLE_MISSING,
        CommandError::Execution { .. } => exit_codes::SYNC_FAILED,
        CommandError::TimedOut(_) => exit_codes::TIMEOUT,
        CommandError::InvalidCommand(_) | CommandError::Io(_) => exit_codes::UNEXPECTED_FAILURE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::ExecutionResult;
    use clap::CommandFactory;
    use std::time::Duration;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_sync() {
        let cli = Cli::parse_from([
            "snapsync",
            "--verbose",
            "sync",
            "--executable",
            "/usr/bin/snapraid",
            "--quiet",
            "--timeout",
            "60",
        ]);
        assert!(cli.verbose);
        let Commands::Sync(args) = cli.command;
        assert_eq!(args.executable.as_deref(), Some("/usr/bin/snapraid"));
        assert!(args.quiet);
        assert_eq!(args.timeout, Some(60));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["snapsync", "sync", "--json-output", "--log-file", "x.log"]);
        assert!(cli.json_output);
        assert_eq!(cli.log_file, Some(PathBuf::from("x.log")));
    }

    #[test]
    fn test_categorize_error() {
        let missing = anyhow::Error::new(SetupError::ExecutableNotFound(PathBuf::from("/x")));
        assert_eq!(categorize_error(&missing), exit_codes::EXECUTABLE_MISSING);

        let failed = anyhow::Error::new(SetupError::Command(CommandError::Execution {
            program: "snapraid".to_string(),
            code: 1,
            result: ExecutionResult::default(),
        }));
        assert_eq!(categorize_error(&failed), exit_codes::SYNC_FAILED);

        let timed_out = anyhow::Error::new(CommandError::TimedOut(Duration::from_secs(1)));
        assert_eq!(categorize_error(&timed_out), exit_codes::TIMEOUT);

        let config = anyhow::Error::new(SettingsError::Read {
            path: PathBuf::from("/x.toml"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        });
        assert_eq!(categorize_error(&config), exit_codes::CONFIG_ERROR);

        let other = anyhow::anyhow!("something else");
        assert_eq!(categorize_error(&other), exit_codes::UNEXPECTED_FAILURE);
    }
}
