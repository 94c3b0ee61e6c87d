//! Request view handed to middleware and handlers.

use std::fmt;
use std::sync::Arc;

use courier_core::{Agent, CodecResult, InboundMessage, Payload, PayloadCodec};

use crate::app::App;

#[derive(Clone)]
struct RequestInner {
    app: App,
    agent: Agent,
    route: String,
    headers: Payload,
    body: Payload,
}

/// An inbound request.
///
/// Cheap to clone. Mutation (by middleware or [`Request::decode_with`]) copies
/// the inner data if other clones are alive.
#[derive(Clone)]
pub struct Request {
    inner: Arc<RequestInner>,
}

impl Request {
    /// Builds a request from an inbound message.
    pub fn new(app: App, message: InboundMessage) -> Self {
        Self {
            inner: Arc::new(RequestInner {
                app,
                agent: message.sender,
                route: message.route,
                headers: message.headers,
                body: message.body,
            }),
        }
    }

    /// The application that received the request.
    pub fn app(&self) -> &App {
        &self.inner.app
    }

    /// The sender.
    pub fn agent(&self) -> &Agent {
        &self.inner.agent
    }

    pub fn route(&self) -> &str {
        &self.inner.route
    }

    /// The `method` header, if present and a string.
    pub fn method(&self) -> Option<&str> {
        self.inner.headers.method()
    }

    pub fn headers(&self) -> &Payload {
        &self.inner.headers
    }

    pub fn body(&self) -> &Payload {
        &self.inner.body
    }

    /// Replaces the headers.
    pub fn set_headers(&mut self, headers: impl Into<Payload>) {
        Arc::make_mut(&mut self.inner).headers = headers.into();
    }

    /// Replaces the body.
    pub fn set_body(&mut self, body: impl Into<Payload>) {
        Arc::make_mut(&mut self.inner).body = body.into();
    }

    /// Decodes raw headers and body in place.
    ///
    /// A field that fails to decode becomes null; the first failure is
    /// returned after both fields have been processed.
    pub fn decode_with(&mut self, codec: &dyn PayloadCodec) -> CodecResult<()> {
        let inner = Arc::make_mut(&mut self.inner);
        let mut first_err = None;

        for field in [&mut inner.headers, &mut inner.body] {
            let payload = std::mem::take(field);
            match payload.decode_with(codec) {
                Ok(decoded) => *field = decoded,
                Err(e) => {
                    first_err.get_or_insert(e);
                }
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("agent", &self.inner.agent)
            .field("route", &self.inner.route)
            .field("headers", &self.inner.headers)
            .field("body", &self.inner.body)
            .finish()
    }
}
