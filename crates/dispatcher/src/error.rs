//! Dispatcher error types

use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Renderer creation error
    #[error("failed to create renderer '{name}': {message}")]
    RendererCreation { name: String, message: String },

    /// Store creation error
    #[error("failed to create store '{name}': {message}")]
    StoreCreation { name: String, message: String },

    /// Renderer / store error (from contract)
    #[error("collaborator error: {0}")]
    Contract(#[from] contracts::ContractError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DispatcherError {
    pub fn renderer_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RendererCreation {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn store_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StoreCreation {
            name: name.into(),
            message: message.into(),
        }
    }
}
