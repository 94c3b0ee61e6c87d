//! Logical wire messages exchanged with the transport.
//!
//! The layout is logical rather than byte-exact: each transport decides how to
//! put these fields on its medium.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::payload::Payload;

/// Sender metadata attached to every inbound message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    /// Network identifier of the sender.
    pub address: String,
    /// Port the sender expects replies on.
    pub port: u16,
    /// Signal distance (or any transport-specific metric) to the sender.
    #[serde(default)]
    pub distance: f64,
}

impl Agent {
    /// Creates agent metadata.
    pub fn new(address: impl Into<String>, port: u16, distance: f64) -> Self {
        Self {
            address: address.into(),
            port,
            distance,
        }
    }
}

impl fmt::Display for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.port)
    }
}

/// Kind tag carried by every outbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    /// The payload produced by `Response::send`.
    #[serde(rename = "expServerResponse")]
    Response,
    /// A status notification produced by `Response::set_status`.
    #[serde(rename = "expServerStatus")]
    Status,
}

impl MessageKind {
    /// Returns the wire name of this kind.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Response => "expServerResponse",
            Self::Status => "expServerStatus",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message delivered to the server by its event source.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    /// Who sent the message.
    pub sender: Agent,
    /// Target route, matched exactly.
    pub route: String,
    /// Request headers; `method` lives here.
    pub headers: Payload,
    /// Request body.
    pub body: Payload,
}

impl InboundMessage {
    /// Creates an inbound message with empty headers and a null body.
    pub fn new(sender: Agent, route: impl Into<String>) -> Self {
        Self {
            sender,
            route: route.into(),
            headers: Payload::empty_object(),
            body: Payload::null(),
        }
    }

    /// Sets the headers.
    pub fn with_headers(mut self, headers: impl Into<Payload>) -> Self {
        self.headers = headers.into();
        self
    }

    /// Sets the body.
    pub fn with_body(mut self, body: impl Into<Payload>) -> Self {
        self.body = body.into();
        self
    }
}

/// A message handed to the transport for delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Target network identifier.
    pub address: String,
    /// Target port.
    pub port: u16,
    /// What this message carries.
    pub kind: MessageKind,
    /// Response headers at the time of sending.
    pub headers: Payload,
    /// Send arguments, or the single status value for [`MessageKind::Status`].
    pub args: Vec<Payload>,
}

impl OutboundMessage {
    /// Builds a response message addressed to `target`.
    pub fn response(target: &Agent, headers: Payload, args: Vec<Payload>) -> Self {
        Self {
            address: target.address.clone(),
            port: target.port,
            kind: MessageKind::Response,
            headers,
            args,
        }
    }

    /// Builds a status message addressed to `target`.
    pub fn status(target: &Agent, headers: Payload, status: u16) -> Self {
        Self {
            address: target.address.clone(),
            port: target.port,
            kind: MessageKind::Status,
            headers,
            args: vec![Payload::from(status)],
        }
    }

    /// Returns the status code carried by a status message.
    pub fn status_code(&self) -> Option<u16> {
        if self.kind != MessageKind::Status {
            return None;
        }
        let code = self.args.first()?.as_value()?.as_u64()?;
        u16::try_from(code).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_wire_names() {
        assert_eq!(
            serde_json::to_value(MessageKind::Response).unwrap(),
            json!("expServerResponse")
        );
        assert_eq!(MessageKind::Status.as_str(), "expServerStatus");
    }

    #[test]
    fn test_status_code() {
        let agent = Agent::new("peer", 9, 0.0);
        let status = OutboundMessage::status(&agent, Payload::empty_object(), 400);
        assert_eq!(status.status_code(), Some(400));

        let response = OutboundMessage::response(&agent, Payload::empty_object(), vec![]);
        assert_eq!(response.status_code(), None);
    }
}
