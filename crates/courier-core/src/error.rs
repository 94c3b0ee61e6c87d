//! Unified error types for the Courier core.
//!
//! Framework-level errors (routing, response lifecycle) live in
//! `courier-framework`; runtime errors live in `courier-runtime`.

use thiserror::Error;

// =============================================================================
// Transport Errors
// =============================================================================

/// Errors that can occur in transport operations.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The transport has not been opened on any port yet.
    #[error("transport is not open")]
    NotOpen,

    /// Opening the transport on a port failed.
    #[error("failed to open port {port}: {reason}")]
    OpenFailed {
        /// The port that could not be opened.
        port: u16,
        /// Reason for failure.
        reason: String,
    },

    /// Message send failed.
    #[error("failed to send message: {0}")]
    SendFailed(String),

    /// The inbound side of the transport closed.
    #[error("transport closed: {reason}")]
    Closed {
        /// Reason for closure.
        reason: String,
    },

    /// A frame received from the wire could not be understood.
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    /// A target address could not be resolved.
    #[error("invalid address '{address}': {reason}")]
    InvalidAddress {
        /// The offending address.
        address: String,
        /// Reason for failure.
        reason: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

// =============================================================================
// Codec Errors
// =============================================================================

/// Errors raised by a [`PayloadCodec`](crate::codec::PayloadCodec).
#[derive(Debug, Clone, Error)]
pub enum CodecError {
    /// A structured value could not be encoded.
    #[error("{codec} encode failed: {reason}")]
    Encode {
        /// Name of the codec.
        codec: &'static str,
        /// Reason for failure.
        reason: String,
    },

    /// A raw payload could not be decoded.
    #[error("{codec} decode failed: {reason}")]
    Decode {
        /// Name of the codec.
        codec: &'static str,
        /// Reason for failure.
        reason: String,
    },
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;
