//! Per-request response handle.
//!
//! A [`Response`] is bound to the sender of one request. It can set a status
//! code and deliver one payload; everything after the first successful send is
//! refused.

use std::fmt;
use std::sync::Arc;

use courier_core::{Agent, BoxedTransport, MessageKind, OutboundMessage, Payload};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::{ResponseError, ResponseResult};
use crate::middleware::{BoxedMiddleware, Outgoing};

#[derive(Debug)]
struct ResponseState {
    sent: bool,
    headers: Payload,
    status: Option<u16>,
    outgoing: Option<Vec<Payload>>,
}

struct ResponseInner {
    reply_to: Agent,
    transport: BoxedTransport,
    middleware: Arc<[BoxedMiddleware]>,
    state: Mutex<ResponseState>,
    // Serialises status/send so the sent flag is checked and set atomically
    // across the transport await.
    send_lock: tokio::sync::Mutex<()>,
}

/// The reply side of a request.
///
/// Clones share state: a send through one clone is visible through all.
#[derive(Clone)]
pub struct Response {
    inner: Arc<ResponseInner>,
}

impl Response {
    /// Creates a response addressed to `reply_to`.
    pub fn new(
        reply_to: Agent,
        transport: BoxedTransport,
        middleware: Arc<[BoxedMiddleware]>,
    ) -> Self {
        Self {
            inner: Arc::new(ResponseInner {
                reply_to,
                transport,
                middleware,
                state: Mutex::new(ResponseState {
                    sent: false,
                    headers: Payload::empty_object(),
                    status: None,
                    outgoing: None,
                }),
                send_lock: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Where replies go.
    pub fn reply_to(&self) -> &Agent {
        &self.inner.reply_to
    }

    /// Returns `true` once a send has succeeded.
    pub fn is_sent(&self) -> bool {
        self.inner.state.lock().sent
    }

    /// Current response headers.
    pub fn headers(&self) -> Payload {
        self.inner.state.lock().headers.clone()
    }

    /// Last status code set, if any.
    pub fn status(&self) -> Option<u16> {
        self.inner.state.lock().status
    }

    /// Arguments of the delivered response, after outbound middleware.
    pub fn outgoing(&self) -> Option<Vec<Payload>> {
        self.inner.state.lock().outgoing.clone()
    }

    /// Replaces the response headers.
    ///
    /// Allowed at any time; headers only matter for messages sent afterwards.
    pub fn set_headers(&self, headers: impl Into<Payload>) -> &Self {
        self.inner.state.lock().headers = headers.into();
        self
    }

    /// Records `status` and sends a status message to the requester.
    ///
    /// Fails with [`ResponseError::AlreadySent`] after a successful send. A
    /// transport failure is logged and does not fail the call.
    pub async fn set_status(&self, status: u16) -> ResponseResult<&Self> {
        let _guard = self.inner.send_lock.lock().await;

        let headers = {
            let mut state = self.inner.state.lock();
            if state.sent {
                return Err(ResponseError::AlreadySent);
            }
            state.status = Some(status);
            state.headers.clone()
        };

        let out = self.run_outbound(MessageKind::Status, headers, Vec::new());
        let message = OutboundMessage::status(&self.inner.reply_to, out.headers, status);
        if let Err(e) = self.inner.transport.send(message).await {
            warn!(to = %self.inner.reply_to, status, "Failed to send status: {e}");
        }

        Ok(self)
    }

    /// Sends a single payload. See [`Response::send_args`].
    pub async fn send(&self, payload: impl Into<Payload>) -> bool {
        self.send_args(vec![payload.into()]).await
    }

    /// Sends the response.
    ///
    /// Outbound middleware rewrites the headers and arguments first; a
    /// middleware error is logged and skipped. Returns `false` if a response
    /// was already sent or the transport refused the message. Only a
    /// successful delivery marks the response as sent.
    pub async fn send_args(&self, args: Vec<Payload>) -> bool {
        let _guard = self.inner.send_lock.lock().await;

        let headers = {
            let state = self.inner.state.lock();
            if state.sent {
                debug!(to = %self.inner.reply_to, "Response already sent, ignoring send");
                return false;
            }
            state.headers.clone()
        };

        let out = self.run_outbound(MessageKind::Response, headers, args);
        let message = OutboundMessage::response(&self.inner.reply_to, out.headers, out.args.clone());
        let delivered = match self.inner.transport.send(message).await {
            Ok(()) => true,
            Err(e) => {
                warn!(to = %self.inner.reply_to, "Failed to send response: {e}");
                false
            }
        };

        let mut state = self.inner.state.lock();
        state.sent = delivered;
        if delivered {
            state.outgoing = Some(out.args);
        }
        delivered
    }
}

impl Response {
    fn run_outbound(&self, kind: MessageKind, headers: Payload, args: Vec<Payload>) -> Outgoing {
        let mut out = Outgoing::new(kind, self.inner.reply_to.clone(), headers, args);
        for middleware in self.inner.middleware.iter() {
            if let Err(e) = middleware.outbound(&mut out) {
                warn!(middleware = middleware.name(), %kind, "Outbound middleware failed: {e}");
            }
        }
        out
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("Response")
            .field("reply_to", &self.inner.reply_to)
            .field("transport", &self.inner.transport.name())
            .field("sent", &state.sent)
            .field("status", &state.status)
            .finish()
    }
}
