//! Layered error definitions
//!
//! Categorized by source: config / provider / session / renderer / store

use thiserror::Error;

use crate::SessionState;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Provider Errors =====
    /// Location provider failed to start or stopped delivering
    #[error("location provider '{source_name}' error: {message}")]
    Provider {
        source_name: String,
        message: String,
    },

    /// Raw fix could not be turned into a sample
    #[error("invalid fix: {message}")]
    InvalidFix { message: String },

    // ===== Session Errors =====
    /// Command is not legal in the current session state
    #[error("illegal transition: cannot {command} while {state}")]
    IllegalTransition {
        command: &'static str,
        state: SessionState,
    },

    // ===== Renderer / Store Errors =====
    /// Renderer draw error
    #[error("renderer '{renderer_name}' error: {message}")]
    Renderer {
        renderer_name: String,
        message: String,
    },

    /// Summary persistence error
    #[error("store '{store_name}' error: {message}")]
    Store { store_name: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create provider error
    pub fn provider(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    pub fn invalid_fix(message: impl Into<String>) -> Self {
        Self::InvalidFix {
            message: message.into(),
        }
    }

    /// Create renderer error
    pub fn renderer(renderer_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Renderer {
            renderer_name: renderer_name.into(),
            message: message.into(),
        }
    }

    /// Create store error
    pub fn store(store_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Store {
            store_name: store_name.into(),
            message: message.into(),
        }
    }
}
