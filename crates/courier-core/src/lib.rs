//! # Courier Core
//!
//! Foundation types for the Courier request-routing framework.
//!
//! Courier routes Express-style requests over a message-based transport instead
//! of TCP/HTTP. This crate holds everything that sits on the wire boundary:
//!
//! - **Wire messages**: [`InboundMessage`], [`OutboundMessage`], [`MessageKind`]
//!   and the sender metadata [`Agent`]
//! - **Payloads**: [`Payload`], either raw wire data or a structured value
//! - **Transport traits**: [`Transport`] (send side) and [`EventSource`]
//!   (receive side)
//! - **Codec boundary**: [`PayloadCodec`] and the stock [`JsonCodec`]
//!
//! ```text
//! ┌──────────────┐  InboundMessage  ┌────────────┐
//! │ EventSource  │─────────────────▶│   Server   │
//! └──────────────┘                  │  run loop  │
//! ┌──────────────┐ OutboundMessage  │            │
//! │  Transport   │◀─────────────────│            │
//! └──────────────┘                  └────────────┘
//! ```

pub mod codec;
pub mod error;
pub mod payload;
pub mod transport;
pub mod wire;

pub use codec::{JsonCodec, PayloadCodec};
pub use error::{CodecError, CodecResult, TransportError, TransportResult};
pub use payload::Payload;
pub use transport::{BoxedEventSource, BoxedTransport, EventSource, Transport, TransportEvent};
pub use wire::{Agent, InboundMessage, MessageKind, OutboundMessage};

// Re-exported so downstream crates can build payloads without a direct dependency.
pub use serde_json::{self, Value, json};
