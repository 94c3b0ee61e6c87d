//! In-process transport.
//!
//! [`MemoryTransport::channel`] returns the three ends of an in-memory device:
//! the send side and event source a server runs on, plus a [`MemoryPeer`] that
//! plays the remote side: it injects requests, reads what the server sent and
//! can make the device fail on demand.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::trace;

use courier_core::{
    Agent, EventSource, InboundMessage, OutboundMessage, Payload, Transport, TransportError,
    TransportEvent, TransportResult, json,
};

#[derive(Debug, Default)]
struct DeviceState {
    opens: AtomicUsize,
    ports: Mutex<Vec<u16>>,
    fail_sends: AtomicBool,
    fail_opens: AtomicBool,
}

/// Send side of the in-memory device.
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    outbound: mpsc::UnboundedSender<OutboundMessage>,
    state: Arc<DeviceState>,
}

impl MemoryTransport {
    /// Creates a connected transport, event source and peer.
    pub fn channel() -> (MemoryTransport, MemoryEventSource, MemoryPeer) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let state = Arc::new(DeviceState::default());

        (
            MemoryTransport {
                outbound: outbound_tx,
                state: Arc::clone(&state),
            },
            MemoryEventSource { inbound: inbound_rx },
            MemoryPeer {
                inbound: inbound_tx,
                outbound: outbound_rx,
                state,
            },
        )
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn open(&self, port: u16) -> TransportResult<()> {
        self.state.opens.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_opens.load(Ordering::SeqCst) {
            return Err(TransportError::OpenFailed {
                port,
                reason: "simulated failure".to_string(),
            });
        }

        let mut ports = self.state.ports.lock();
        if !ports.contains(&port) {
            ports.push(port);
        }
        Ok(())
    }

    async fn send(&self, message: OutboundMessage) -> TransportResult<()> {
        if self.state.fail_sends.load(Ordering::SeqCst) {
            return Err(TransportError::SendFailed("simulated failure".to_string()));
        }
        trace!(kind = %message.kind, to = %message.address, "Memory send");
        self.outbound
            .send(message)
            .map_err(|_| TransportError::SendFailed("peer dropped".to_string()))
    }
}

/// Receive side of the in-memory device.
///
/// Yields [`TransportEvent::Closed`] once the peer closes or is dropped.
#[derive(Debug)]
pub struct MemoryEventSource {
    inbound: mpsc::UnboundedReceiver<TransportEvent>,
}

#[async_trait]
impl EventSource for MemoryEventSource {
    async fn next_event(&mut self) -> TransportResult<TransportEvent> {
        Ok(self.inbound.recv().await.unwrap_or(TransportEvent::Closed))
    }
}

/// The remote end of the in-memory device.
#[derive(Debug)]
pub struct MemoryPeer {
    inbound: mpsc::UnboundedSender<TransportEvent>,
    outbound: mpsc::UnboundedReceiver<OutboundMessage>,
    state: Arc<DeviceState>,
}

impl MemoryPeer {
    /// Delivers a message to the server. Returns `false` if the event source is gone.
    pub fn inject(&self, message: InboundMessage) -> bool {
        self.inbound.send(TransportEvent::Inbound(message)).is_ok()
    }

    /// Delivers a structured request from a default test agent.
    pub fn request(&self, route: &str, method: &str, body: impl Into<Payload>) -> bool {
        let message = InboundMessage::new(Agent::new("peer", 1, 0.0), route)
            .with_headers(json!({ "method": method }))
            .with_body(body);
        self.inject(message)
    }

    /// Tells the event source to stop.
    pub fn close(&self) -> bool {
        self.inbound.send(TransportEvent::Closed).is_ok()
    }

    /// Waits for the next message the server sent.
    pub async fn recv(&mut self) -> Option<OutboundMessage> {
        self.outbound.recv().await
    }

    /// Returns a message the server already sent, without waiting.
    pub fn try_recv(&mut self) -> Option<OutboundMessage> {
        self.outbound.try_recv().ok()
    }

    /// Takes every message sent so far.
    pub fn drain(&mut self) -> Vec<OutboundMessage> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }

    /// How many times the transport has been opened.
    pub fn open_count(&self) -> usize {
        self.state.opens.load(Ordering::SeqCst)
    }

    /// Distinct ports the transport was opened on.
    pub fn opened_ports(&self) -> Vec<u16> {
        self.state.ports.lock().clone()
    }

    /// Makes every subsequent send fail.
    pub fn fail_sends(&self, fail: bool) {
        self.state.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Makes every subsequent open fail.
    pub fn fail_opens(&self, fail: bool) {
        self.state.fail_opens.store(fail, Ordering::SeqCst);
    }
}
