//! Error types for the Courier framework.

use courier_core::CodecError;
use thiserror::Error;

/// Why a request could not be routed to a listener.
///
/// The `Display` form is the internal diagnostic; [`client_message`] is what
/// the remote caller sees in the `{error: ...}` body of the 400 reply.
///
/// [`client_message`]: RouteError::client_message
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// No listener is registered for the route, whatever the method.
    #[error("route does not exist")]
    UnknownRoute,

    /// The request headers carry no method.
    #[error("no method provided")]
    MissingMethod,

    /// The route exists but no listener accepts the method.
    #[error("no listener exists for this route and method")]
    NoListener,
}

impl RouteError {
    /// Message sent back to the caller.
    pub fn client_message(&self) -> &'static str {
        match self {
            Self::UnknownRoute => "Route does not exist.",
            Self::MissingMethod => "No method provided",
            Self::NoListener => "No listener exists for this route and method",
        }
    }
}

/// Errors from the response lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResponseError {
    /// The response has already been delivered.
    #[error("response already sent")]
    AlreadySent,
}

/// Failure raised by a middleware's outbound hook.
///
/// These never abort delivery; the response logs them and moves on.
#[derive(Debug, Clone, Error)]
pub enum MiddlewareError {
    /// Payload encoding failed.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Custom middleware error.
    #[error("{0}")]
    Custom(String),
}

impl MiddlewareError {
    /// Creates a custom middleware error.
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }
}

/// Result type for route resolution.
pub type RouteResult<T> = Result<T, RouteError>;

/// Result type for response operations.
pub type ResponseResult<T> = Result<T, ResponseError>;

/// Result type for middleware hooks.
pub type MiddlewareResult<T> = Result<T, MiddlewareError>;
