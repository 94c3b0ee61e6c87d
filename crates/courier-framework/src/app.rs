//! Application state: listeners and middleware.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::handler::{Chain, Handler};
use crate::middleware::{BoxedMiddleware, FnMiddleware, Middleware, MiddlewareOutcome};
use crate::registry::{ListenerEntry, ListenerId, ListenerRegistry};
use crate::request::Request;
use crate::response::Response;

/// Listener and middleware registrations.
///
/// Cheap to clone; clones share the same registrations. Changes made while a
/// request is being dispatched take effect from the next request.
#[derive(Clone, Default)]
pub struct App {
    listeners: Arc<RwLock<ListenerRegistry>>,
    middleware: Arc<RwLock<Vec<BoxedMiddleware>>>,
}

impl App {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a single handler for `route` and `method`.
    pub fn on<H, T>(&self, route: impl Into<String>, method: impl Into<String>, handler: H) -> ListenerId
    where
        H: Handler<T>,
        T: 'static,
    {
        self.register(route.into(), method.into(), Chain::new().handler(handler), false)
    }

    /// Registers a handler chain for `route` and `method`.
    pub fn on_chain(&self, route: impl Into<String>, method: impl Into<String>, chain: Chain) -> ListenerId {
        self.register(route.into(), method.into(), chain, false)
    }

    /// Registers a handler that is removed after its first dispatch.
    pub fn once<H, T>(&self, route: impl Into<String>, method: impl Into<String>, handler: H) -> ListenerId
    where
        H: Handler<T>,
        T: 'static,
    {
        self.register(route.into(), method.into(), Chain::new().handler(handler), true)
    }

    /// Registers a chain that is removed after its first dispatch.
    pub fn once_chain(&self, route: impl Into<String>, method: impl Into<String>, chain: Chain) -> ListenerId {
        self.register(route.into(), method.into(), chain, true)
    }

    /// Removes a listener. Returns `false` if it was not registered.
    pub fn off(&self, id: ListenerId) -> bool {
        let removed = self.listeners.write().remove(id).is_some();
        if removed {
            debug!(listener = %id, "Listener removed");
        }
        removed
    }

    /// Appends a middleware.
    pub fn use_middleware<M: Middleware>(&self, middleware: M) -> &Self {
        self.use_boxed(Arc::new(middleware))
    }

    /// Appends an already shared middleware.
    pub fn use_boxed(&self, middleware: BoxedMiddleware) -> &Self {
        debug!(middleware = middleware.name(), "Middleware registered");
        self.middleware.write().push(middleware);
        self
    }

    /// Appends an inbound-only middleware built from a closure.
    pub fn use_fn<F>(&self, name: impl Into<String>, func: F) -> &Self
    where
        F: Fn(&mut Request, &Response) -> MiddlewareOutcome + Send + Sync + 'static,
    {
        self.use_middleware(FnMiddleware::new(name, func))
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    pub fn middleware_count(&self) -> usize {
        self.middleware.read().len()
    }

    /// Point-in-time copy of the listener registry.
    pub fn snapshot(&self) -> ListenerRegistry {
        self.listeners.read().clone()
    }

    /// Point-in-time copy of the middleware list.
    pub fn middleware_snapshot(&self) -> Arc<[BoxedMiddleware]> {
        self.middleware.read().iter().cloned().collect()
    }

    /// Removes a once-listener ahead of running it.
    ///
    /// `None` means another dispatch already consumed it.
    pub(crate) fn take_once(&self, id: ListenerId) -> Option<ListenerEntry> {
        self.listeners.write().remove(id)
    }

    fn register(&self, route: String, method: String, chain: Chain, once: bool) -> ListenerId {
        let stages = chain.len();
        let id = self
            .listeners
            .write()
            .register(route.as_str(), method.as_str(), chain.freeze(), once);
        debug!(listener = %id, %route, %method, stages, once, "Listener registered");
        id
    }
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("listeners", &self.listener_count())
            .field("middleware", &self.middleware_count())
            .finish()
    }
}
