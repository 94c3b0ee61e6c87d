//! # Courier Transport
//!
//! Transport implementations for the Courier framework.
//!
//! This crate provides concrete implementations of the `Transport` and
//! `EventSource` traits defined in `courier-core`.
//!
//! ## Features
//!
//! - *(always)*: in-process [`MemoryTransport`], used by tests and embedders
//! - `udp`: JSON-over-UDP datagram transport
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │  courier-runtime    │  (server run loop)
//! ├─────────────────────┤
//! │  courier-core       │  (Transport / EventSource traits)
//! ├─────────────────────┤
//! │  courier-transport  │  <- This crate (implementations)
//! ├─────────────────────┤
//! │  Network / channels │
//! └─────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use courier_transport::MemoryTransport;
//!
//! let (transport, events, mut peer) = MemoryTransport::channel();
//! let server = Server::new(transport, events);
//!
//! peer.request("/ping", "GET", Payload::null());
//! let reply = peer.recv().await;
//! ```

pub mod memory;

#[cfg(feature = "udp")]
pub mod udp;

pub use memory::{MemoryEventSource, MemoryPeer, MemoryTransport};

#[cfg(feature = "udp")]
pub use udp::{UdpEventSource, UdpTransport};
