//! snapsync - command line entry point

use clap::Parser;
use snapsync::cli::{self, exit_codes, Cli, Commands};
use snapsync::logging::{self, LoggingOptions};
use snapsync::settings::Settings;

fn main() {
    std::process::exit(run());
}

fn run() -> i32 {
    let cli = Cli::parse();

    let settings = match Settings::load(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {}", e);
            return exit_codes::CONFIG_ERROR;
        }
    };

    let logging_options = LoggingOptions {
        verbose: cli.verbose,
        json: cli.json_output || settings.logging.json,
        level: settings.logging.level.clone(),
        file: cli.log_file.clone().or_else(|| settings.logging.file.clone()),
    };

    // Initialize logging
    if let Err(e) = logging::init(&logging_options) {
        eprintln!("Failed to initialize logging: {}", e);
        return exit_codes::UNEXPECTED_FAILURE;
    }

    // Create tokio runtime for async commands
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create runtime: {}", e);
            return exit_codes::UNEXPECTED_FAILURE;
        }
    };

    match cli.command {
        Commands::Sync(args) => rt.block_on(async {
            match cli::sync::run(args, &settings).await {
                Ok(()) => exit_codes::SUCCESS,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    cli::categorize_error(&e)
                }
            }
        }),
    }
}
