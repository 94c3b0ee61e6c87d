//! Request dispatcher.
//!
//! One call to [`Dispatcher::dispatch`] handles one inbound message:
//!
//! 1. Registrations are snapshotted; later changes apply to the next message
//! 2. Every middleware's inbound hook runs in order; a rejection replies 500
//! 3. The route is validated against the snapshot; an unknown route replies 400
//! 4. The listener for the route and method is resolved; a miss replies 400
//! 5. A once-listener is removed, then the matching chain runs
//!
//! By default a rejection does not stop the cycle: later steps keep running
//! and may reply again (the response refuses anything after the first
//! successful send). [`DispatchOptions::short_circuit`] stops at the first
//! rejection instead.

use std::convert::Infallible;
use std::task::{Context, Poll};

use courier_core::{BoxedTransport, InboundMessage, json};
use futures::future::BoxFuture;
use tracing::{Instrument, Level, debug, span, warn};

use crate::app::App;
use crate::error::{ResponseError, RouteError};
use crate::handler::run_chain;
use crate::middleware::MiddlewareOutcome;
use crate::registry::ListenerId;
use crate::request::Request;
use crate::response::Response;

/// Message sent with a middleware rejection that carries none.
pub const GENERIC_ERROR: &str = "An error occurred.";

/// Dispatch behaviour switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOptions {
    /// Stop the cycle at the first middleware or routing rejection.
    pub short_circuit: bool,
}

/// What a dispatch cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The listener's chain ran.
    Handled(ListenerId),
    /// Routing failed; an error reply was sent.
    Rejected(RouteError),
    /// A middleware rejected the request and short-circuiting stopped the cycle.
    Halted,
    /// The resolved once-listener was consumed by a concurrent dispatch.
    Expired(ListenerId),
}

/// Routes inbound messages through an [`App`].
#[derive(Clone)]
pub struct Dispatcher {
    app: App,
    transport: BoxedTransport,
    options: DispatchOptions,
}

impl Dispatcher {
    pub fn new(app: App, transport: BoxedTransport) -> Self {
        Self::with_options(app, transport, DispatchOptions::default())
    }

    pub fn with_options(app: App, transport: BoxedTransport, options: DispatchOptions) -> Self {
        Self {
            app,
            transport,
            options,
        }
    }

    pub fn app(&self) -> &App {
        &self.app
    }

    pub fn options(&self) -> DispatchOptions {
        self.options
    }

    /// Runs one dispatch cycle.
    pub async fn dispatch(&self, message: InboundMessage) -> DispatchOutcome {
        let span = span!(
            Level::DEBUG,
            "dispatch",
            route = %message.route,
            from = %message.sender,
        );
        self.dispatch_inner(message).instrument(span).await
    }

    async fn dispatch_inner(&self, message: InboundMessage) -> DispatchOutcome {
        let registry = self.app.snapshot();
        let middleware = self.app.middleware_snapshot();

        let res = Response::new(
            message.sender.clone(),
            self.transport.clone(),
            middleware.clone(),
        );
        let mut req = Request::new(self.app.clone(), message);

        let mut rejected = false;
        for m in middleware.iter() {
            if let MiddlewareOutcome::Reject(msg) = m.inbound(&mut req, &res) {
                debug!(middleware = m.name(), "Middleware rejected request");
                rejected = true;
                let msg = msg.as_deref().unwrap_or(GENERIC_ERROR);
                reply_error(&res, 500, msg).await;
            }
        }
        if rejected && self.options.short_circuit {
            return DispatchOutcome::Halted;
        }

        if let Err(e) = registry.validate_route(req.route()) {
            debug!("Route validation failed: {e}");
            reply_error(&res, 400, e.client_message()).await;
            if self.options.short_circuit {
                return DispatchOutcome::Rejected(e);
            }
        }

        let entry = match registry.resolve(req.headers(), req.route()) {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Listener resolution failed: {e}");
                reply_error(&res, 400, e.client_message()).await;
                // An unknown route also fails resolution; report the first cause.
                let cause = match registry.validate_route(req.route()) {
                    Err(unknown) => unknown,
                    Ok(()) => e,
                };
                return DispatchOutcome::Rejected(cause);
            }
        };

        let id = entry.id();
        if entry.is_once() && self.app.take_once(id).is_none() {
            warn!(listener = %id, "Once-listener already consumed");
            return DispatchOutcome::Expired(id);
        }

        debug!(listener = %id, method = entry.method(), "Running listener chain");
        run_chain(entry.chain(), req, res).await;
        DispatchOutcome::Handled(id)
    }
}

/// Sends `status` followed by `{error: msg}`.
async fn reply_error(res: &Response, status: u16, msg: &str) {
    match res.set_status(status).await {
        Ok(res) => {
            res.send(json!({ "error": msg })).await;
        }
        Err(ResponseError::AlreadySent) => {
            debug!(status, error = msg, "Response already sent, dropping error reply");
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("app", &self.app)
            .field("transport", &self.transport.name())
            .field("options", &self.options)
            .finish()
    }
}

impl tower::Service<InboundMessage> for Dispatcher {
    type Response = DispatchOutcome;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<DispatchOutcome, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, message: InboundMessage) -> Self::Future {
        let this = self.clone();
        Box::pin(async move { Ok(this.dispatch(message).await) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::Next;
    use courier_core::{Agent, MessageKind, OutboundMessage, Payload};
    use courier_transport::{MemoryPeer, MemoryTransport};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    fn setup(options: DispatchOptions) -> (App, Dispatcher, MemoryPeer) {
        let (transport, _events, peer) = MemoryTransport::channel();
        let app = App::new();
        let dispatcher = Dispatcher::with_options(app.clone(), Arc::new(transport), options);
        (app, dispatcher, peer)
    }

    fn message(route: &str, method: Option<&str>) -> InboundMessage {
        let headers = match method {
            Some(m) => Payload::from(json!({ "method": m })),
            None => Payload::empty_object(),
        };
        InboundMessage::new(Agent::new("client", 7000, 3.0), route).with_headers(headers)
    }

    fn error_of(msg: &OutboundMessage) -> Option<&str> {
        msg.args.first()?.get("error")?.as_str()
    }

    async fn pong(_req: Request, res: Response) {
        res.send(json!({"pong": true})).await;
    }

    #[tokio::test]
    async fn test_dispatch_ping() {
        let (app, dispatcher, mut peer) = setup(DispatchOptions::default());
        let id = app.on("/ping", "GET", pong);

        let outcome = dispatcher.dispatch(message("/ping", Some("GET"))).await;
        assert_eq!(outcome, DispatchOutcome::Handled(id));

        let sent = peer.drain();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].kind, MessageKind::Response);
        assert_eq!(sent[0].address, "client");
        assert_eq!(sent[0].port, 7000);
        assert_eq!(sent[0].args, vec![Payload::from(json!({"pong": true}))]);
    }

    #[tokio::test]
    async fn test_unknown_route_replies_once() {
        let (app, dispatcher, mut peer) = setup(DispatchOptions::default());
        app.on("/ping", "GET", pong);

        let outcome = dispatcher.dispatch(message("/nope", Some("GET"))).await;
        assert_eq!(outcome, DispatchOutcome::Rejected(RouteError::UnknownRoute));

        // Status 400 + error body, then a second status attempt is refused.
        let sent = peer.drain();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].status_code(), Some(400));
        assert_eq!(error_of(&sent[1]), Some("Route does not exist."));
    }

    #[tokio::test]
    async fn test_missing_method() {
        let (app, dispatcher, mut peer) = setup(DispatchOptions::default());
        app.on("/ping", "GET", pong);

        let outcome = dispatcher.dispatch(message("/ping", None)).await;
        assert_eq!(outcome, DispatchOutcome::Rejected(RouteError::MissingMethod));

        let sent = peer.drain();
        assert_eq!(sent[0].status_code(), Some(400));
        assert_eq!(error_of(&sent[1]), Some("No method provided"));
    }

    #[tokio::test]
    async fn test_wrong_method() {
        let (app, dispatcher, mut peer) = setup(DispatchOptions::default());
        app.on("/ping", "GET", pong);

        let outcome = dispatcher.dispatch(message("/ping", Some("POST"))).await;
        assert_eq!(outcome, DispatchOutcome::Rejected(RouteError::NoListener));

        let sent = peer.drain();
        assert_eq!(
            error_of(&sent[1]),
            Some("No listener exists for this route and method")
        );
    }

    #[tokio::test]
    async fn test_middleware_reject_continues_by_default() {
        let (app, dispatcher, mut peer) = setup(DispatchOptions::default());
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        app.on("/ping", "GET", move |_req: Request, res: Response| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                res.send(json!("late")).await
            }
        });
        app.use_fn("deny", |_, _| MiddlewareOutcome::Reject(None));

        let outcome = dispatcher.dispatch(message("/ping", Some("GET"))).await;
        assert!(matches!(outcome, DispatchOutcome::Handled(_)));
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        // Only the rejection reply gets through.
        let sent = peer.drain();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].status_code(), Some(500));
        assert_eq!(error_of(&sent[1]), Some(GENERIC_ERROR));
    }

    #[tokio::test]
    async fn test_middleware_reject_short_circuits() {
        let (app, dispatcher, mut peer) = setup(DispatchOptions { short_circuit: true });
        app.on("/ping", "GET", pong);
        app.use_fn("deny", |_, _| MiddlewareOutcome::reject("denied"));

        let outcome = dispatcher.dispatch(message("/ping", Some("GET"))).await;
        assert_eq!(outcome, DispatchOutcome::Halted);

        let sent = peer.drain();
        assert_eq!(sent.len(), 2);
        assert_eq!(error_of(&sent[1]), Some("denied"));
    }

    #[tokio::test]
    async fn test_middleware_can_rewrite_request() {
        let (app, dispatcher, mut peer) = setup(DispatchOptions::default());
        app.use_fn("force-get", |req, _| {
            req.set_headers(json!({"method": "GET"}));
            MiddlewareOutcome::Continue
        });
        app.on("/ping", "GET", pong);

        let outcome = dispatcher.dispatch(message("/ping", Some("DELETE"))).await;
        assert!(matches!(outcome, DispatchOutcome::Handled(_)));
        assert_eq!(peer.drain().len(), 1);
    }

    #[tokio::test]
    async fn test_once_listener_runs_once() {
        let (app, dispatcher, mut peer) = setup(DispatchOptions::default());
        let id = app.once("/hello", "GET", pong);

        assert_eq!(
            dispatcher.dispatch(message("/hello", Some("GET"))).await,
            DispatchOutcome::Handled(id)
        );
        assert_eq!(app.listener_count(), 0);
        assert_eq!(
            dispatcher.dispatch(message("/hello", Some("GET"))).await,
            DispatchOutcome::Rejected(RouteError::UnknownRoute)
        );

        let sent = peer.drain();
        assert_eq!(sent[0].kind, MessageKind::Response);
        assert_eq!(sent[1].status_code(), Some(400));
    }

    #[tokio::test]
    async fn test_once_listener_consumed_after_snapshot_expires() {
        let (app, dispatcher, mut peer) = setup(DispatchOptions::default());
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let id = app.once("/hello", "GET", move |_req: Request, res: Response| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                res.send(json!("hi")).await
            }
        });
        // Runs after the registry snapshot, so the entry still resolves.
        app.use_fn("consume", move |req, _| {
            req.app().off(id);
            MiddlewareOutcome::Continue
        });

        let outcome = dispatcher.dispatch(message("/hello", Some("GET"))).await;
        assert_eq!(outcome, DispatchOutcome::Expired(id));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert!(peer.drain().is_empty());
        assert_eq!(app.listener_count(), 0);
    }

    #[tokio::test]
    async fn test_chain_halts_without_next() {
        let (app, dispatcher, mut peer) = setup(DispatchOptions::default());
        let stop = |_req: Request, res: Response, _next: Next| async move {
            let _ = res.set_status(403).await;
        };
        app.on_chain("/guarded", "GET", crate::chain![stop, pong]);

        dispatcher.dispatch(message("/guarded", Some("GET"))).await;

        let sent = peer.drain();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].status_code(), Some(403));
    }

    #[tokio::test]
    async fn test_listener_added_by_handler_applies_next_cycle() {
        let (app, dispatcher, _peer) = setup(DispatchOptions::default());
        app.on("/register", "POST", |req: Request, _res: Response| async move {
            req.app().on("/late", "GET", pong);
        });

        dispatcher.dispatch(message("/register", Some("POST"))).await;
        let outcome = dispatcher.dispatch(message("/late", Some("GET"))).await;
        assert!(matches!(outcome, DispatchOutcome::Handled(_)));
    }

    #[tokio::test]
    async fn test_service_interface() {
        let (app, dispatcher, _peer) = setup(DispatchOptions::default());
        let id = app.on("/ping", "GET", pong);

        let outcome = dispatcher
            .oneshot(message("/ping", Some("GET")))
            .await
            .unwrap();
        assert_eq!(outcome, DispatchOutcome::Handled(id));
    }
}
