//! Logging configuration using tracing

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// How the global subscriber should be set up
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoggingOptions {
    pub verbose: bool,
    pub json: bool,
    /// Filter used when RUST_LOG is unset and not verbose
    pub level: String,
    /// Append records (without colours) to this file as well
    pub file: Option<PathBuf>,
}

fn build_filter(options: &LoggingOptions) -> EnvFilter {
    if options.verbose {
        return EnvFilter::new("debug");
    }
    let level = if options.level.is_empty() {
        "info"
    } else {
        options.level.as_str()
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Initialize the logging system
pub fn init(options: &LoggingOptions) -> anyhow::Result<()> {
    let file_layer = match &options.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Arc::new(file)),
            )
        }
        None => None,
    };

    let registry = tracing_subscriber::registry()
        .with(build_filter(options))
        .with(file_layer);

    if options.json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()?;
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_overrides_level() {
        let options = LoggingOptions {
            verbose: true,
            level: "warn".to_string(),
            ..Default::default()
        };
        assert_eq!(build_filter(&options).to_string(), "debug");
    }

    // Only this test touches RUST_LOG, so both cases share it
    #[test]
    fn test_configured_level_without_rust_log() {
        std::env::remove_var("RUST_LOG");

        let options = LoggingOptions {
            level: "warn".to_string(),
            ..Default::default()
        };
        assert_eq!(build_filter(&options).to_string(), "warn");

        let options = LoggingOptions::default();
        assert!(options.level.is_empty());
        assert_eq!(build_filter(&options).to_string(), "info");
    }
}
