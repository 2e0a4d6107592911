//! Error types for CLI operations.

use thiserror::Error;
use tracking_engine::TrackerError;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// `--control` script could not be parsed
    #[error("Invalid control script '{script}': {message}")]
    InvalidControl { script: String, message: String },

    /// Tracker rejected a command or stopped responding
    #[error("Tracker error: {0}")]
    Tracker(#[from] TrackerError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error wrapper
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn invalid_control(script: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidControl {
            script: script.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
