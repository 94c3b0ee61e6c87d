//! Runtime error types.

use thiserror::Error;

use crate::config::ConfigError;
use courier_core::TransportError;

/// Errors that can occur during runtime operations.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The transport failed to open.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Configuration could not be loaded or is invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// `listen` was called while the server is already listening.
    #[error("Server is already listening")]
    AlreadyListening,
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
