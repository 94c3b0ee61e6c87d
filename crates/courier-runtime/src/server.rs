//! The server run loop.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use courier_runtime::Server;
//!
//! let server = Server::builder()
//!     .config_file("courier.toml")
//!     .build_udp()?;
//!
//! server.on("/ping", "GET", |_req: Request, res: Response| async move {
//!     res.send(json!({"pong": true})).await
//! });
//!
//! server.handle().stop_on_ctrl_c();
//! server.listen_configured().await?;
//! ```
//!
//! A server owns one transport and one event source. `listen` loops until
//! [`Server::stop`] (or a [`ServerHandle`]) cancels it or the event source
//! closes, handling one inbound message at a time.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{CodecKind, ConfigLoader, CourierConfig, validate_config};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;
use courier_core::{
    BoxedEventSource, BoxedTransport, EventSource, InboundMessage, JsonCodec, Transport,
    TransportEvent,
};
use courier_framework::{
    App, BoxedMiddleware, Chain, CodecMiddleware, DispatchOptions, DispatchOutcome, Dispatcher,
    Handler, ListenerId, Middleware, MiddlewareOutcome, Request, Response,
};

// =============================================================================
// ServerHandle
// =============================================================================

#[derive(Debug, Default)]
struct HandleState {
    listening: AtomicBool,
    cancel: Mutex<CancellationToken>,
}

/// Cloneable handle for stopping a server from another task.
#[derive(Debug, Clone, Default)]
pub struct ServerHandle {
    state: Arc<HandleState>,
}

impl ServerHandle {
    /// Returns `true` while `listen` is running.
    pub fn is_listening(&self) -> bool {
        self.state.listening.load(Ordering::SeqCst)
    }

    /// Stops the run loop, interrupting a pending wait.
    ///
    /// Returns `false` if the server was not listening. A dispatch already in
    /// progress finishes first.
    pub fn stop(&self) -> bool {
        let cancel = self.state.cancel.lock();
        if !self.is_listening() {
            return false;
        }
        cancel.cancel();
        true
    }

    /// Spawns a task that stops the server on Ctrl+C.
    pub fn stop_on_ctrl_c(&self) -> JoinHandle<()> {
        let handle = self.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Received Ctrl+C, stopping server");
                    handle.stop();
                }
                Err(e) => warn!("Failed to listen for Ctrl+C: {e}"),
            }
        })
    }

    // `listening` only changes while `cancel` is locked, so a concurrent
    // `stop` always sees the token of the run it reports on.
    fn start(&self) -> RuntimeResult<CancellationToken> {
        let mut cancel = self.state.cancel.lock();
        if self.is_listening() {
            return Err(RuntimeError::AlreadyListening);
        }

        let token = CancellationToken::new();
        *cancel = token.clone();
        self.state.listening.store(true, Ordering::SeqCst);
        Ok(token)
    }

    fn finish(&self) {
        let _cancel = self.state.cancel.lock();
        self.state.listening.store(false, Ordering::SeqCst);
    }
}

// =============================================================================
// Server
// =============================================================================

/// A Courier server bound to one transport.
pub struct Server {
    app: App,
    dispatcher: Dispatcher,
    transport: BoxedTransport,
    events: tokio::sync::Mutex<BoxedEventSource>,
    handle: ServerHandle,
    config: CourierConfig,
}

impl Server {
    /// Creates a server with default settings.
    pub fn new<T, E>(transport: T, events: E) -> Self
    where
        T: Transport + 'static,
        E: EventSource + 'static,
    {
        Self::from_config(transport, events, &CourierConfig::default())
    }

    /// Creates a server from loaded configuration.
    ///
    /// Logging is left alone; see [`ServerBuilder`] for the full setup.
    pub fn from_config<T, E>(transport: T, events: E, config: &CourierConfig) -> Self
    where
        T: Transport + 'static,
        E: EventSource + 'static,
    {
        Self::from_parts(Arc::new(transport), Box::new(events), config)
    }

    /// Creates a server from already boxed transport halves.
    pub fn from_parts(
        transport: BoxedTransport,
        events: BoxedEventSource,
        config: &CourierConfig,
    ) -> Self {
        let app = App::new();
        if config.server.codec == CodecKind::Json {
            app.use_middleware(CodecMiddleware::new(JsonCodec));
        }

        let options = DispatchOptions {
            short_circuit: config.server.short_circuit,
        };
        let dispatcher = Dispatcher::with_options(app.clone(), Arc::clone(&transport), options);

        debug!(
            transport = transport.name(),
            codec = ?config.server.codec,
            short_circuit = options.short_circuit,
            "Server created"
        );

        Self {
            app,
            dispatcher,
            transport,
            events: tokio::sync::Mutex::new(events),
            handle: ServerHandle::default(),
            config: config.clone(),
        }
    }

    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    pub fn app(&self) -> &App {
        &self.app
    }

    pub fn config(&self) -> &CourierConfig {
        &self.config
    }

    pub fn handle(&self) -> ServerHandle {
        self.handle.clone()
    }

    pub fn is_listening(&self) -> bool {
        self.handle.is_listening()
    }

    // ─── Registration ───────────────────────────────────────────────────────

    /// Appends a global middleware (Express `use`).
    pub fn use_middleware<M: Middleware>(&self, middleware: M) -> &Self {
        self.app.use_middleware(middleware);
        self
    }

    pub fn use_boxed(&self, middleware: BoxedMiddleware) -> &Self {
        self.app.use_boxed(middleware);
        self
    }

    /// Appends an inbound-only middleware built from a closure.
    pub fn use_fn<F>(&self, name: impl Into<String>, func: F) -> &Self
    where
        F: Fn(&mut Request, &Response) -> MiddlewareOutcome + Send + Sync + 'static,
    {
        self.app.use_fn(name, func);
        self
    }

    pub fn on<H, T>(&self, route: impl Into<String>, method: impl Into<String>, handler: H) -> ListenerId
    where
        H: Handler<T>,
        T: 'static,
    {
        self.app.on(route, method, handler)
    }

    pub fn on_chain(&self, route: impl Into<String>, method: impl Into<String>, chain: Chain) -> ListenerId {
        self.app.on_chain(route, method, chain)
    }

    pub fn once<H, T>(&self, route: impl Into<String>, method: impl Into<String>, handler: H) -> ListenerId
    where
        H: Handler<T>,
        T: 'static,
    {
        self.app.once(route, method, handler)
    }

    pub fn once_chain(&self, route: impl Into<String>, method: impl Into<String>, chain: Chain) -> ListenerId {
        self.app.once_chain(route, method, chain)
    }

    pub fn off(&self, id: ListenerId) -> bool {
        self.app.off(id)
    }

    // ─── Run loop ───────────────────────────────────────────────────────────

    /// Runs one dispatch cycle without the run loop.
    pub async fn dispatch(&self, message: InboundMessage) -> DispatchOutcome {
        self.dispatcher.dispatch(message).await
    }

    /// Listens on the configured `server.port`.
    pub async fn listen_configured(&self) -> RuntimeResult<()> {
        self.listen(self.config.server.port).await
    }

    /// Listens on `port` until stopped or the event source closes.
    ///
    /// The transport is (re)opened at the top of every iteration; an open
    /// failure ends the loop with an error. Receive errors are logged and the
    /// loop keeps going.
    pub async fn listen(&self, port: u16) -> RuntimeResult<()> {
        let cancel = self.handle.start()?;
        info!(port, transport = self.transport.name(), "Server listening");

        let result = self.run_loop(port, &cancel).await;

        self.handle.finish();
        match &result {
            Ok(()) => info!(port, "Server stopped"),
            Err(e) => warn!(port, "Server stopped: {e}"),
        }
        result
    }

    async fn run_loop(&self, port: u16, cancel: &CancellationToken) -> RuntimeResult<()> {
        let mut events = self.events.lock().await;

        loop {
            self.transport.open(port).await?;

            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(()),
                event = events.next_event() => event,
            };

            match event {
                Ok(TransportEvent::Inbound(message)) => {
                    let outcome = self.dispatcher.dispatch(message).await;
                    debug!(?outcome, "Dispatch finished");
                }
                Ok(TransportEvent::Closed) => {
                    info!("Event source closed");
                    return Ok(());
                }
                Err(e) => warn!("Failed to receive message: {e}"),
            }
        }
    }

    /// Stops the run loop. Returns `false` if it was not running.
    pub fn stop(&self) -> bool {
        self.handle.stop()
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("app", &self.app)
            .field("transport", &self.transport.name())
            .field("listening", &self.is_listening())
            .finish()
    }
}

// =============================================================================
// ServerBuilder
// =============================================================================

/// Loads configuration, initialises logging and builds a [`Server`].
///
/// ```rust,ignore
/// let server = Server::builder()
///     .config_file("deploy/courier.toml")
///     .profile("production")
///     .build(transport, events)?;
/// ```
#[derive(Debug, Default)]
pub struct ServerBuilder {
    config_file: Option<PathBuf>,
    profile: Option<String>,
    config: Option<CourierConfig>,
    init_logging: bool,
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            init_logging: true,
            ..Default::default()
        }
    }

    /// Loads this file instead of searching the default locations.
    pub fn config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    /// Uses an already loaded configuration; no files are read.
    pub fn config(mut self, config: CourierConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Leaves the global tracing subscriber alone.
    pub fn without_logging(mut self) -> Self {
        self.init_logging = false;
        self
    }

    /// Resolves and validates the configuration.
    pub fn load(&mut self) -> RuntimeResult<CourierConfig> {
        let config = match self.config.take() {
            Some(config) => config,
            None => {
                let mut loader = ConfigLoader::new();
                if let Some(profile) = &self.profile {
                    loader = loader.profile(profile);
                }
                if let Some(path) = &self.config_file {
                    loader = loader.file(path);
                }
                loader.load()?
            }
        };
        validate_config(&config)?;
        Ok(config)
    }

    /// Builds a server on the given transport.
    pub fn build<T, E>(mut self, transport: T, events: E) -> RuntimeResult<Server>
    where
        T: Transport + 'static,
        E: EventSource + 'static,
    {
        let config = self.load()?;
        if self.init_logging {
            logging::init_from_config(&config.logging);
        }
        Ok(Server::from_config(transport, events, &config))
    }

    /// Builds a server on a UDP transport bound to `server.bind_host`.
    #[cfg(feature = "udp")]
    pub fn build_udp(mut self) -> RuntimeResult<Server> {
        let config = self.load()?;
        if self.init_logging {
            logging::init_from_config(&config.logging);
        }
        let (transport, events) = courier_transport::UdpTransport::new(&config.server.bind_host);
        Ok(Server::from_config(transport, events, &config))
    }
}
