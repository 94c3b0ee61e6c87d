//! Courier Runtime - the server layer of the Courier framework.
//!
//! This crate provides:
//! - The [`Server`] run loop and its stop [`ServerHandle`]
//! - Layered configuration (`config`)
//! - Logging setup (`logging`)
//!
//! ```ignore
//! use courier_runtime::Server;
//! use courier_transport::MemoryTransport;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let (transport, events, _peer) = MemoryTransport::channel();
//!     let server = Server::builder().build(transport, events)?;
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
//! # Features
//!
//! - `toml-config` *(default)* / `yaml-config`: configuration file formats
//! - `json-log`: JSON log lines
//! - `udp`: [`ServerBuilder::build_udp`]

pub mod config;
pub mod error;
pub mod logging;
pub mod server;

pub use config::{ConfigError, ConfigLoader, ConfigResult, CourierConfig, ServerConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use server::{Server, ServerBuilder, ServerHandle};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Logging macros for application code.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
