//! Transport abstraction.
//!
//! The server talks to the outside world through two traits:
//!
//! - [`Transport`] opens a port and delivers [`OutboundMessage`]s. Delivery is
//!   best-effort; a failed send is reported, never retried.
//! - [`EventSource`] yields the next [`TransportEvent`] for the run loop.
//!
//! Concrete implementations live in `courier-transport`.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::TransportResult;
use crate::wire::{InboundMessage, OutboundMessage};

/// Send side of a transport device.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Short transport name used in logs.
    fn name(&self) -> &'static str;

    /// Opens the transport on `port`.
    ///
    /// The run loop calls this once per iteration, so implementations must be
    /// idempotent for a port that is already open.
    async fn open(&self, port: u16) -> TransportResult<()>;

    /// Delivers a message. `Ok` means the device accepted it, not that the
    /// peer received it.
    async fn send(&self, message: OutboundMessage) -> TransportResult<()>;
}

/// Shared transport handle.
pub type BoxedTransport = Arc<dyn Transport>;

/// Something the event source observed.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// A message arrived.
    Inbound(InboundMessage),
    /// The source is exhausted; the run loop stops.
    Closed,
}

/// Receive side of a transport device.
#[async_trait]
pub trait EventSource: Send {
    /// Waits for the next event.
    ///
    /// Errors describe a single bad delivery (for example an unparseable
    /// frame); the run loop logs them and keeps waiting.
    async fn next_event(&mut self) -> TransportResult<TransportEvent>;
}

/// Owned event source handle.
pub type BoxedEventSource = Box<dyn EventSource>;
