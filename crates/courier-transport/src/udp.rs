//! UDP datagram transport.
//!
//! Each datagram carries one JSON frame.
//!
//! Inbound (client to server):
//!
//! ```json
//! {"route": "/ping", "headers": {"method": "GET"}, "body": null}
//! ```
//!
//! `headers` defaults to `{}` and `body` to `null`. A JSON string in either
//! field is delivered as a raw payload for the codec middleware to decode.
//!
//! Outbound (server to client):
//!
//! ```json
//! {"kind": "expServerResponse", "headers": {}, "args": [{"pong": true}]}
//! ```
//!
//! The sender's address and port come from the datagram source; distance is
//! always `0.0`.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::net::UdpSocket;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, trace};

use courier_core::{
    Agent, EventSource, InboundMessage, MessageKind, OutboundMessage, Payload, Transport,
    TransportError, TransportEvent, TransportResult,
};

/// Largest datagram accepted.
const MAX_DATAGRAM: usize = 64 * 1024;

#[derive(Debug, Deserialize)]
struct InboundFrame {
    route: String,
    #[serde(default = "Payload::empty_object")]
    headers: Payload,
    #[serde(default)]
    body: Payload,
}

#[derive(Debug, Serialize)]
struct OutboundFrame<'a> {
    kind: MessageKind,
    headers: &'a Payload,
    args: &'a [Payload],
}

#[derive(Debug)]
struct Bound {
    port: u16,
    socket: Arc<UdpSocket>,
}

/// Send side of the UDP transport.
#[derive(Debug, Clone)]
pub struct UdpTransport {
    bind_host: String,
    bound: Arc<Mutex<Option<Bound>>>,
    socket_tx: Arc<watch::Sender<Option<Arc<UdpSocket>>>>,
}

impl UdpTransport {
    /// Creates an unbound transport and its event source.
    ///
    /// Nothing is bound until [`Transport::open`] is called.
    pub fn new(bind_host: impl Into<String>) -> (UdpTransport, UdpEventSource) {
        let (socket_tx, socket_rx) = watch::channel(None);
        (
            UdpTransport {
                bind_host: bind_host.into(),
                bound: Arc::new(Mutex::new(None)),
                socket_tx: Arc::new(socket_tx),
            },
            UdpEventSource { socket_rx },
        )
    }

    pub fn bind_host(&self) -> &str {
        &self.bind_host
    }

    /// Local address of the bound socket.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        let bound = self.bound.lock().await;
        bound.as_ref().and_then(|b| b.socket.local_addr().ok())
    }
}

#[async_trait]
impl Transport for UdpTransport {
    fn name(&self) -> &'static str {
        "udp"
    }

    async fn open(&self, port: u16) -> TransportResult<()> {
        let mut bound = self.bound.lock().await;
        if let Some(existing) = bound.as_ref() {
            if existing.port == port {
                return Ok(());
            }
            return Err(TransportError::OpenFailed {
                port,
                reason: format!("already bound to port {}", existing.port),
            });
        }

        let socket = UdpSocket::bind((self.bind_host.as_str(), port))
            .await
            .map_err(|e| TransportError::OpenFailed {
                port,
                reason: e.to_string(),
            })?;
        let socket = Arc::new(socket);
        info!(host = %self.bind_host, port, "UDP transport bound");

        self.socket_tx.send_replace(Some(Arc::clone(&socket)));
        *bound = Some(Bound { port, socket });
        Ok(())
    }

    async fn send(&self, message: OutboundMessage) -> TransportResult<()> {
        let socket = {
            let bound = self.bound.lock().await;
            match bound.as_ref() {
                Some(b) => Arc::clone(&b.socket),
                None => return Err(TransportError::NotOpen),
            }
        };

        let frame = OutboundFrame {
            kind: message.kind,
            headers: &message.headers,
            args: &message.args,
        };
        let bytes =
            serde_json::to_vec(&frame).map_err(|e| TransportError::SendFailed(e.to_string()))?;

        let target = resolve_target(&message.address, message.port).await?;
        socket
            .send_to(&bytes, target)
            .await
            .map_err(|e| TransportError::SendFailed(format!("{target}: {e}")))?;
        trace!(kind = %message.kind, to = %message.address, port = message.port, "Datagram sent");
        Ok(())
    }
}

/// Resolves a reply address; only lookup failures are address errors.
async fn resolve_target(address: &str, port: u16) -> TransportResult<SocketAddr> {
    let invalid = |reason: String| TransportError::InvalidAddress {
        address: format!("{address}:{port}"),
        reason,
    };
    tokio::net::lookup_host((address, port))
        .await
        .map_err(|e| invalid(e.to_string()))?
        .next()
        .ok_or_else(|| invalid("no addresses found".to_string()))
}

/// Receive side of the UDP transport.
///
/// Waits until the paired transport is opened, then yields one event per
/// datagram.
#[derive(Debug)]
pub struct UdpEventSource {
    socket_rx: watch::Receiver<Option<Arc<UdpSocket>>>,
}

impl UdpEventSource {
    async fn socket(&mut self) -> Option<Arc<UdpSocket>> {
        let socket = self.socket_rx.wait_for(Option::is_some).await.ok()?;
        socket.as_ref().map(Arc::clone)
    }
}

#[async_trait]
impl EventSource for UdpEventSource {
    async fn next_event(&mut self) -> TransportResult<TransportEvent> {
        let Some(socket) = self.socket().await else {
            debug!("UDP transport dropped, closing event source");
            return Ok(TransportEvent::Closed);
        };

        let mut buf = vec![0u8; MAX_DATAGRAM];
        let (len, from) = socket.recv_from(&mut buf).await?;
        parse_frame(&buf[..len], from).map(TransportEvent::Inbound)
    }
}

fn parse_frame(data: &[u8], from: SocketAddr) -> TransportResult<InboundMessage> {
    let frame: InboundFrame =
        serde_json::from_slice(data).map_err(|e| TransportError::InvalidFrame(e.to_string()))?;

    Ok(InboundMessage {
        sender: Agent::new(from.ip().to_string(), from.port(), 0.0),
        route: frame.route,
        headers: frame.headers,
        body: frame.body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::json;
    use std::time::Duration;

    #[test]
    fn test_parse_frame_defaults() {
        let from: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        let message = parse_frame(br#"{"route":"/ping"}"#, from).unwrap();

        assert_eq!(message.route, "/ping");
        assert_eq!(message.headers, Payload::empty_object());
        assert!(message.body.is_null());
        assert_eq!(message.sender.address, "127.0.0.1");
        assert_eq!(message.sender.port, 9000);
    }

    #[test]
    fn test_parse_frame_raw_fields() {
        let from: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        let message =
            parse_frame(br#"{"route":"/a","headers":"{\"method\":\"GET\"}"}"#, from).unwrap();
        assert!(message.headers.is_raw());
    }

    #[test]
    fn test_parse_frame_rejects_garbage() {
        let from: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        assert!(matches!(
            parse_frame(b"not json", from),
            Err(TransportError::InvalidFrame(_))
        ));
    }

    #[tokio::test]
    async fn test_send_before_open() {
        let (transport, _events) = UdpTransport::new("127.0.0.1");
        let target = Agent::new("127.0.0.1", 9, 0.0);
        let result = transport
            .send(OutboundMessage::status(&target, Payload::empty_object(), 200))
            .await;
        assert!(matches!(result, Err(TransportError::NotOpen)));
    }

    #[tokio::test]
    async fn test_socket_error_is_a_send_failure() {
        let (transport, _events) = UdpTransport::new("127.0.0.1");
        transport.open(0).await.unwrap();

        // An IPv6 target resolves fine but an IPv4 socket cannot reach it.
        let target = Agent::new("::1", 9, 0.0);
        let result = transport
            .send(OutboundMessage::status(&target, Payload::empty_object(), 200))
            .await;
        assert!(matches!(result, Err(TransportError::SendFailed(_))));
    }

    #[tokio::test]
    async fn test_resolve_literal_target() {
        let addr = resolve_target("127.0.0.1", 4000).await.unwrap();
        assert_eq!(addr, "127.0.0.1:4000".parse::<SocketAddr>().unwrap());
    }

    #[tokio::test]
    async fn test_request_reply_over_loopback() {
        let (transport, mut events) = UdpTransport::new("127.0.0.1");
        transport.open(0).await.unwrap();
        transport.open(0).await.unwrap();
        let server_addr = transport.local_addr().await.unwrap();

        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let frame = json!({"route": "/ping", "headers": {"method": "GET"}});
        client
            .send_to(frame.to_string().as_bytes(), server_addr)
            .await
            .unwrap();

        let event = tokio::time::timeout(Duration::from_secs(5), events.next_event())
            .await
            .unwrap()
            .unwrap();
        let TransportEvent::Inbound(message) = event else {
            panic!("expected an inbound message");
        };
        assert_eq!(message.headers.method(), Some("GET"));
        assert_eq!(message.sender.port, client.local_addr().unwrap().port());

        let reply = OutboundMessage::response(
            &message.sender,
            Payload::empty_object(),
            vec![Payload::from(json!({"pong": true}))],
        );
        transport.send(reply).await.unwrap();

        let mut buf = [0u8; 1024];
        let (len, _) = tokio::time::timeout(Duration::from_secs(5), client.recv_from(&mut buf))
            .await
            .unwrap()
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf[..len]).unwrap();
        assert_eq!(value["kind"], "expServerResponse");
        assert_eq!(value["args"][0]["pong"], true);
    }
}
