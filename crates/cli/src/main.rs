//! Storefront cart command-line client

use std::process::ExitCode;

use tracing::debug;

use crate::config::CliConfig;

mod commands;
mod config;
mod observability;
mod render;

#[tokio::main]
async fn main() -> ExitCode {
    // Load configuration from .env and CLI arguments
    let config = match CliConfig::load() {
        Ok(config) => config,
        Err(config_error) => {
            // Help and version requests arrive here too and print to stdout.
            _ = config_error.print();

            return if config_error.use_stderr() {
                ExitCode::from(2)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    if let Err(init_error) = observability::init_subscriber(&config.logging) {
        #[expect(
            clippy::print_stderr,
            reason = "logging not initialized, must use eprintln for init errors"
        )]
        {
            eprintln!("Logging error: {init_error}");
        }

        return ExitCode::FAILURE;
    }

    match commands::run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(command_error) => {
            debug!(error = ?command_error, "command failed");

            #[expect(
                clippy::print_stderr,
                reason = "the message is for the user, not the log"
            )]
            {
                eprintln!("{}", command_error.user_message());
            }

            ExitCode::FAILURE
        }
    }
}
