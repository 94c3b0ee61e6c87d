//! # Courier
//!
//! Express-style request routing over message-based transports.
//!
//! ## Overview
//!
//! Clients address a server by network identifier and port. Each inbound
//! message carries a route, a method in its headers, and a body. The server
//! runs it through global middleware, resolves the listener for the route and
//! method, and runs that listener's handler chain, which replies at most once.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────────────────────────────────────┐
//! │ EventSource │────▶│ Server run loop                             │
//! └─────────────┘     │   Dispatcher                                │
//!                     │     middleware ─▶ route ─▶ method ─▶ chain  │
//! ┌─────────────┐     │                                    │        │
//! │  Transport  │◀────│   Response (send once) ◀───────────┘        │
//! └─────────────┘     └─────────────────────────────────────────────┘
//! ```
//!
//! - **courier-core**: wire messages, payloads, transport and codec traits
//! - **courier-framework**: `App`, handler chains, request/response, dispatcher
//! - **courier-transport**: in-memory and UDP transports
//! - **courier-runtime**: server run loop, configuration, logging
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use courier::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let server = Server::builder().build_udp()?;
//!
//!     server.on("/ping", "GET", |_req: Request, res: Response| async move {
//!         res.send(json!({"pong": true})).await
//!     });
//!
//!     server.handle().stop_on_ctrl_c();
//!     server.listen_configured().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config` *(default)* / `yaml-config`: configuration file formats
//! - `json-log`: JSON log output
//! - `udp`: UDP datagram transport

pub use courier_core as core;
pub use courier_framework as framework;
pub use courier_runtime as runtime;
pub use courier_transport as transport;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use courier::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use courier_runtime::{Server, ServerBuilder, ServerHandle};

    // Handlers and chains
    pub use courier_framework::chain;
    pub use courier_framework::{
        App, Chain, CodecMiddleware, DispatchOutcome, Handler, ListenerId, Middleware,
        MiddlewareOutcome, Next, Outgoing, Request, Response, decode_stage,
    };

    // Wire types
    pub use courier_core::{Agent, InboundMessage, JsonCodec, Payload, json};

    // Transports
    pub use courier_transport::MemoryTransport;
    #[cfg(feature = "udp")]
    pub use courier_transport::UdpTransport;
}
