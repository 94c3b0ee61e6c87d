//! Codec adapter.
//!
//! Installed as middleware, [`CodecMiddleware`] decodes every inbound request
//! and encodes every outgoing response. [`decode_stage`] does the inbound half
//! for a single chain.

use std::fmt;

use courier_core::{JsonCodec, PayloadCodec};
use tracing::warn;

use crate::error::MiddlewareResult;
use crate::handler::{Handler, Next, Stage};
use crate::middleware::{Middleware, MiddlewareOutcome, Outgoing};
use crate::request::Request;
use crate::response::Response;

/// Decodes requests and encodes responses with a [`PayloadCodec`].
///
/// A request field that fails to decode becomes null and the request goes on.
/// On the way out only table-like payloads are encoded; if any of them fails,
/// none of the outgoing payloads are changed.
#[derive(Clone, Default)]
pub struct CodecMiddleware<C = JsonCodec> {
    codec: C,
}

impl<C: PayloadCodec> CodecMiddleware<C> {
    pub fn new(codec: C) -> Self {
        Self { codec }
    }
}

impl<C: PayloadCodec + 'static> Middleware for CodecMiddleware<C> {
    fn name(&self) -> &str {
        self.codec.name()
    }

    fn inbound(&self, req: &mut Request, _res: &Response) -> MiddlewareOutcome {
        if let Err(e) = req.decode_with(&self.codec) {
            warn!(route = req.route(), "Failed to decode request: {e}");
        }
        MiddlewareOutcome::Continue
    }

    fn outbound(&self, out: &mut Outgoing) -> MiddlewareResult<()> {
        let headers = out.headers.clone().encode_with(&self.codec)?;
        let args = out
            .args
            .iter()
            .cloned()
            .map(|arg| arg.encode_with(&self.codec))
            .collect::<Result<Vec<_>, _>>()?;

        out.headers = headers;
        out.args = args;
        Ok(())
    }
}

impl<C: PayloadCodec> fmt::Debug for CodecMiddleware<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecMiddleware")
            .field("codec", &self.codec.name())
            .finish()
    }
}

/// A passthrough stage that decodes the request, then continues.
pub fn decode_stage<C>(codec: C) -> Stage
where
    C: PayloadCodec + Clone + 'static,
{
    (move |mut req: Request, res: Response, next: Next| {
        let codec = codec.clone();
        async move {
            if let Err(e) = req.decode_with(&codec) {
                warn!(route = req.route(), "Failed to decode request: {e}");
            }
            next.run(req, res).await;
        }
    })
    .into_stage()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::App;
    use crate::dispatcher::Dispatcher;
    use courier_core::{Agent, InboundMessage, MessageKind, Payload, json};
    use courier_transport::MemoryTransport;
    use std::sync::Arc;

    fn raw_message(route: &str, headers: &str, body: &str) -> InboundMessage {
        InboundMessage::new(Agent::new("client", 1, 0.0), route)
            .with_headers(Payload::raw(headers))
            .with_body(Payload::raw(body))
    }

    #[tokio::test]
    async fn test_round_trip_through_dispatch() {
        let (transport, _events, mut peer) = MemoryTransport::channel();
        let app = App::new();
        app.use_middleware(CodecMiddleware::<JsonCodec>::default());
        app.on("/echo", "POST", |req: Request, res: Response| async move {
            res.send(req.body().clone()).await
        });

        let dispatcher = Dispatcher::new(app, Arc::new(transport));
        dispatcher
            .dispatch(raw_message("/echo", r#"{"method":"POST"}"#, r#"{"n":1}"#))
            .await;

        let sent = peer.drain();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].args, vec![Payload::raw(r#"{"n":1}"#)]);
        assert_eq!(sent[0].headers, Payload::raw("{}"));
    }

    #[tokio::test]
    async fn test_status_headers_are_encoded() {
        let (transport, _events, mut peer) = MemoryTransport::channel();
        let app = App::new();
        app.use_middleware(CodecMiddleware::new(JsonCodec));
        app.on("/items", "GET", |_req: Request, res: Response| async move {
            res.set_headers(json!({"page": 1}));
            if let Ok(res) = res.set_status(206).await {
                res.send(json!([1, 2])).await;
            }
        });

        Dispatcher::new(app, Arc::new(transport))
            .dispatch(raw_message("/items", r#"{"method":"GET"}"#, "null"))
            .await;

        let sent = peer.drain();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].kind, MessageKind::Status);
        assert_eq!(sent[0].status_code(), Some(206));
        assert_eq!(sent[0].headers, Payload::raw(r#"{"page":1}"#));
        assert_eq!(sent[1].headers, sent[0].headers);
    }

    #[tokio::test]
    async fn test_scalars_are_not_encoded() {
        let middleware = CodecMiddleware::new(JsonCodec);
        let mut out = Outgoing::new(
            MessageKind::Response,
            Agent::new("client", 1, 0.0),
            Payload::empty_object(),
            vec![Payload::from(json!(5)), Payload::from(json!([1]))],
        );
        middleware.outbound(&mut out).unwrap();

        assert_eq!(out.args, vec![Payload::from(json!(5)), Payload::raw("[1]")]);
    }

    #[tokio::test]
    async fn test_bad_body_becomes_null() {
        let (transport, _events, mut peer) = MemoryTransport::channel();
        let app = App::new();
        app.use_middleware(CodecMiddleware::new(JsonCodec));
        app.on("/echo", "POST", |req: Request, res: Response| async move {
            res.send(json!({ "was_null": req.body().is_null() })).await
        });

        let dispatcher = Dispatcher::new(app, Arc::new(transport));
        dispatcher
            .dispatch(raw_message("/echo", r#"{"method":"POST"}"#, "{broken"))
            .await;

        let sent = peer.drain();
        assert_eq!(sent[0].args, vec![Payload::raw(r#"{"was_null":true}"#)]);
    }

    #[tokio::test]
    async fn test_decode_stage_in_chain() {
        let (transport, _events, mut peer) = MemoryTransport::channel();
        let app = App::new();
        app.on_chain(
            "/items",
            "PUT",
            crate::chain![decode_stage(JsonCodec), |req: Request, res: Response| async move {
                res.send(req.body().clone()).await
            }],
        );

        // Without the middleware, resolution needs structured headers.
        let message = InboundMessage::new(Agent::new("client", 1, 0.0), "/items")
            .with_headers(json!({"method": "PUT"}))
            .with_body(Payload::raw("[3]"));
        Dispatcher::new(app, Arc::new(transport)).dispatch(message).await;

        let sent = peer.drain();
        assert_eq!(sent[0].args, vec![Payload::from(json!([3]))]);
    }
}
