//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and exit codes.

use octostage::config::ConfigFileError;
use octostage::{Collaborator, StageError};
use std::fmt;
use std::process;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(String),
    /// Failed to start the async runtime
    Runtime(std::io::Error),
    /// Loading or staging failed
    Stage(StageError),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Stage(StageError::NotConfigured(Collaborator::RenderBackend)) => {
                eprintln!();
                eprintln!("Set the rendering engine executable in the configuration file:");
                eprintln!("  [render]");
                eprintln!("  command = /path/to/engine");
            }
            CliError::Stage(StageError::NotFound { .. }) => {
                eprintln!();
                eprintln!("Use 'octostage manifest --design <ID>' to list the cached artboards.");
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
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Runtime(e) => write!(f, "Failed to start runtime: {}", e),
            CliError::Stage(StageError::Cancelled) => write!(f, "Interrupted"),
            CliError::Stage(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Runtime(e) => Some(e),
            CliError::Stage(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StageError> for CliError {
    fn from(e: StageError) -> Self {
        CliError::Stage(e)
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e.to_string())
    }
}
