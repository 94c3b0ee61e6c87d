//! # Courier Framework
//!
//! Routing and dispatch for Courier applications.
//!
//! This layer provides:
//! - [`App`]: listener and middleware registrations
//! - Handler chains with Express-style `next` continuations ([`Chain`], [`Next`])
//! - [`Request`] and the send-once [`Response`]
//! - [`Dispatcher`], which runs one request through middleware, routing and
//!   the matching chain
//! - [`CodecMiddleware`], the payload codec adapter
//!
//! The framework knows nothing about sockets; it talks to the outside world
//! through the `Transport` trait from `courier-core`.

pub mod app;
pub mod codec;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod middleware;
pub mod registry;
pub mod request;
pub mod response;

pub use app::App;
pub use codec::{CodecMiddleware, decode_stage};
pub use dispatcher::{DispatchOptions, DispatchOutcome, Dispatcher, GENERIC_ERROR};
pub use error::{
    MiddlewareError, MiddlewareResult, ResponseError, ResponseResult, RouteError, RouteResult,
};
pub use handler::{Chain, Handler, HandlerOutput, Next, Stage};
pub use middleware::{BoxedMiddleware, FnMiddleware, Middleware, MiddlewareOutcome, Outgoing};
pub use registry::{ListenerEntry, ListenerId, ListenerRegistry};
pub use request::Request;
pub use response::Response;

/// Commonly used items.
pub mod prelude {
    pub use crate::chain;
    pub use crate::{
        App, Chain, CodecMiddleware, DispatchOutcome, Dispatcher, Handler, Middleware,
        MiddlewareOutcome, Next, Outgoing, Request, Response,
    };
}
