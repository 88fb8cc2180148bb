//! `snapsync sync`

use std::time::Duration;

use clap::Args;

use crate::host::{tracing_sink, CommandRunner, RunOptions};
use crate::settings::Settings;
use crate::snapraid::SnapraidSetup;

#[derive(Debug, Clone, Default, Args)]
pub struct SyncArgs {
    /// SnapRAID executable path or name in PATH
    #[arg(short, long)]
    pub executable: Option<String>,

    /// Do not echo SnapRAID's output
    #[arg(short, long)]
    pub quiet: bool,

    /// Kill SnapRAID after this many seconds
    #[arg(short, long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

impl SyncArgs {
    /// Executable and run options, with flags taking precedence over settings
    pub fn resolve(&self, settings: &Settings) -> (String, RunOptions) {
        let executable = self
            .executable
            .clone()
            .unwrap_or_else(|| settings.snapraid.executable.clone());
        let options = RunOptions {
            echo: settings.snapraid.print_output && !self.quiet,
            timeout: self
                .timeout
                .map(Duration::from_secs)
                .or_else(|| settings.snapraid.timeout()),
        };
        (executable, options)
    }
}

pub async fn run(args: SyncArgs, settings: &Settings) -> anyhow::Result<()> {
    let (executable, options) = args.resolve(settings);
    let setup = SnapraidSetup::locate(&executable)?;
    let runner = CommandRunner::new().with_events(tracing_sink());

    setup.sync(&runner, &options).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_uses_settings() {
        let mut settings = Settings::default();
        settings.snapraid.executable = "/opt/snapraid".to_string();
        settings.snapraid.timeout_secs = Some(10);

        let (exe, options) = SyncArgs::default().resolve(&settings);
        assert_eq!(exe, "/opt/snapraid");
        assert!(options.echo);
        assert_eq!(options.timeout, Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_resolve_flags_override() {
        let settings = Settings::default();
        let args = SyncArgs {
            executable: Some("/usr/bin/snapraid".to_string()),
            quiet: true,
            timeout: Some(5),
        };

        let (exe, options) = args.resolve(&settings);
        assert_eq!(exe, "/usr/bin/snapraid");
        assert!(!options.echo);
        assert_eq!(options.timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_print_output_off_in_settings_stays_off() {
        let mut settings = Settings::default();
        settings.snapraid.print_output = false;
        let (_, options) = SyncArgs::default().resolve(&settings);
        assert!(!options.echo);
    }

    #[tokio::test]
    async fn test_run_missing_executable() {
        let args = SyncArgs {
            executable: Some("/fake/path/to/snapraid".to_string()),
            ..Default::default()
        };
        let err = run(args, &Settings::default()).await.unwrap_err();
        assert_eq!(
            crate::cli::categorize_error(&err),
            crate::cli::exit_codes::EXECUTABLE_MISSING
        );
    }
}
