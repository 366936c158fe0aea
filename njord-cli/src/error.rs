//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::process;

use njord::config::ConfigError;
use njord::gateway::SourceError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// No valid configuration could be loaded
    Config(ConfigError),
    /// Gateway client could not be created
    Gateway(SourceError),
    /// Tokio runtime could not be started
    Runtime(std::io::Error),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Config(ConfigError::Read { .. }) => {
                eprintln!();
                eprintln!("Provide a configuration with one of:");
                eprintln!("  --config <PATH>       local JSON document");
                eprintln!("  --config-url <URL>    remote document, cached at --config");
                eprintln!(
                    "Default path: {}",
                    njord::config::config_file_path().display()
                );
            }
            CliError::Gateway(SourceError::InvalidBaseUrl(_)) => {
                eprintln!();
                eprintln!("--aos-url must be an http(s):// URL or an existing proxy file.");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::Gateway(e) => write!(f, "Failed to create gateway client: {}", e),
            CliError::Runtime(e) => write!(f, "Failed to start async runtime: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Gateway(e) => Some(e),
            CliError::Runtime(e) => Some(e),
            CliError::LoggingInit(_) => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e)
    }
}

impl From<SourceError> for CliError {
    fn from(e: SourceError) -> Self {
        CliError::Gateway(e)
    }
}
