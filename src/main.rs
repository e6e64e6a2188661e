//! Hookscope inspection CLI.
//!
//! Parses arguments, sets up logging, runs metadata extraction for the
//! requested command and maps errors to exit codes.

mod cli;
mod commands;

use cli::Cli;
use hookscope::config::{AgentConfig, LogLevel};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Environment variable overriding the configured log level.
const LOG_ENV: &str = "HOOKSCOPE_LOG";

fn main() -> ExitCode {
    let cli = Cli::parse_args();

    let config = match cli.config.as_deref() {
        Some(path) => AgentConfig::load(path),
        None => Ok(AgentConfig::default()),
    };

    let config = match config {
        Ok(config) => config,
        Err(err) => {
            init_logging(LogLevel::default());
            eprintln!("Error: {}", err);
            return ExitCode::from(err.exit_code() as u8);
        }
    };

    init_logging(config.log_level);

    match commands::dispatch(cli.command, config) {
        Ok(code) => ExitCode::from(code as u8),
        Err(err) => {
            // Print user-actionable error message to stderr
            eprintln!("Error: {}", err);
            ExitCode::from(err.exit_code() as u8)
        }
    }
}

fn init_logging(level: LogLevel) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
