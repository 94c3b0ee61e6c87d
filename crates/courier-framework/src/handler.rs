//! Handler stages and continuation-passing chains.
//!
//! A listener's behaviour is a [`Chain`]: an ordered list of [`Stage`]s. Each
//! stage is one of two capability variants:
//!
//! - **Terminal**: `(Request, Response)`. It never continues the chain.
//! - **Passthrough**: `(Request, Response, Next)`. Calling
//!   [`Next::run`] invokes the following stage; not calling it halts the chain.
//!
//! Every stage of a chain shares one cursor. Calling `next` advances it, so a
//! stage that calls `next` twice runs the following two stages in turn. The
//! tail of every chain receives a continuation that does nothing.
//!
//! # Example
//!
//! ```rust,ignore
//! use courier_framework::{chain, Next, Request, Response};
//!
//! async fn auth(req: Request, res: Response, next: Next) {
//!     if req.headers().get("token").is_some() {
//!         next.run(req, res).await;
//!     } else {
//!         let _ = res.set_status(401).await;
//!     }
//! }
//!
//! async fn fetch(_req: Request, res: Response) {
//!     res.send(json!({"items": []})).await;
//! }
//!
//! app.on_chain("/items", "GET", chain![auth, fetch]);
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::future::BoxFuture;
use tracing::{error, trace};

use crate::request::Request;
use crate::response::Response;

// ============================================================================
// HandlerOutput - what a handler may return
// ============================================================================

/// Return values a handler is allowed to produce.
pub trait HandlerOutput: Send {
    /// Consumes the value once the handler has finished.
    fn finish(self);
}

impl HandlerOutput for () {
    fn finish(self) {}
}

impl HandlerOutput for bool {
    fn finish(self) {}
}

/// On `Err`, the error is logged.
impl<T: HandlerOutput, E: fmt::Display + Send> HandlerOutput for Result<T, E> {
    fn finish(self) {
        match self {
            Ok(value) => value.finish(),
            Err(e) => error!("Handler error: {e}"),
        }
    }
}

// ============================================================================
// Stage - type-erased chain element
// ============================================================================

/// Type-erased terminal stage.
pub type TerminalFn = Arc<dyn Fn(Request, Response) -> BoxFuture<'static, ()> + Send + Sync>;

/// Type-erased passthrough stage.
pub type PassthroughFn =
    Arc<dyn Fn(Request, Response, Next) -> BoxFuture<'static, ()> + Send + Sync>;

/// One element of a handler chain.
#[derive(Clone)]
pub enum Stage {
    /// Called as `(req, res)`.
    Terminal(TerminalFn),
    /// Called as `(req, res, next)`.
    Passthrough(PassthroughFn),
}

impl Stage {
    /// Returns `true` for the terminal variant.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminal(_))
    }

    fn invoke(&self, req: Request, res: Response, next: Next) -> BoxFuture<'static, ()> {
        match self {
            Self::Terminal(f) => f(req, res),
            Self::Passthrough(f) => f(req, res, next),
        }
    }
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Terminal(_) => f.write_str("Stage::Terminal"),
            Self::Passthrough(_) => f.write_str("Stage::Passthrough"),
        }
    }
}

// ============================================================================
// Handler Trait
// ============================================================================

/// Anything that can become a [`Stage`].
///
/// Implemented for async functions and closures taking `(Request, Response)` or
/// `(Request, Response, Next)` and returning a [`HandlerOutput`], and for
/// [`Stage`] itself. The type parameter only tells the two shapes apart.
pub trait Handler<T>: Clone + Send + Sync + 'static {
    /// Erases the handler into a stage.
    fn into_stage(self) -> Stage;
}

impl<F, Fut, Out> Handler<(Request, Response)> for F
where
    F: Fn(Request, Response) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Out> + Send + 'static,
    Out: HandlerOutput + 'static,
{
    fn into_stage(self) -> Stage {
        Stage::Terminal(Arc::new(move |req: Request, res: Response| -> BoxFuture<'static, ()> {
            let fut = (self)(req, res);
            Box::pin(async move { fut.await.finish() })
        }))
    }
}

impl<F, Fut, Out> Handler<(Request, Response, Next)> for F
where
    F: Fn(Request, Response, Next) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Out> + Send + 'static,
    Out: HandlerOutput + 'static,
{
    fn into_stage(self) -> Stage {
        Stage::Passthrough(Arc::new(
            move |req: Request, res: Response, next: Next| -> BoxFuture<'static, ()> {
                let fut = (self)(req, res, next);
                Box::pin(async move { fut.await.finish() })
            },
        ))
    }
}

impl Handler<Stage> for Stage {
    fn into_stage(self) -> Stage {
        self
    }
}

// ============================================================================
// Next - the continuation
// ============================================================================

/// Continuation handed to passthrough stages.
///
/// Clones share the chain's cursor.
#[derive(Clone)]
pub struct Next {
    stages: Arc<[Stage]>,
    cursor: Arc<AtomicUsize>,
}

impl Next {
    fn start(stages: Arc<[Stage]>) -> Self {
        Self {
            stages,
            cursor: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Advances the cursor and runs the stage it lands on.
    ///
    /// Past the end of the chain this does nothing.
    pub fn run(&self, req: Request, res: Response) -> BoxFuture<'static, ()> {
        let index = self.cursor.fetch_add(1, Ordering::SeqCst) + 1;
        match self.stages.get(index) {
            Some(stage) => {
                trace!(stage = index, terminal = stage.is_terminal(), "Running chain stage");
                stage.invoke(req, res, self.clone())
            }
            None => {
                trace!(stage = index, "End of chain reached");
                Box::pin(async {})
            }
        }
    }

    /// Index of the stage the cursor currently points at.
    pub fn position(&self) -> usize {
        self.cursor.load(Ordering::SeqCst)
    }

    /// Number of stages in the chain.
    pub fn chain_len(&self) -> usize {
        self.stages.len()
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("position", &self.position())
            .field("chain_len", &self.stages.len())
            .finish()
    }
}

/// Runs a frozen chain from its first stage.
pub(crate) fn run_chain(stages: Arc<[Stage]>, req: Request, res: Response) -> BoxFuture<'static, ()> {
    let next = Next::start(stages);
    match next.stages.first() {
        Some(first) => {
            trace!(stage = 0, terminal = first.is_terminal(), "Running chain stage");
            first.invoke(req, res, next.clone())
        }
        None => Box::pin(async {}),
    }
}

// ============================================================================
// Chain - builder for a listener's stages
// ============================================================================

/// Ordered stages forming one listener's pipeline.
#[derive(Clone, Default)]
pub struct Chain {
    stages: Vec<Stage>,
}

impl Chain {
    /// Creates an empty chain.
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Appends a handler.
    pub fn handler<H, T>(mut self, handler: H) -> Self
    where
        H: Handler<T>,
        T: 'static,
    {
        self.stages.push(handler.into_stage());
        self
    }

    /// Appends a pre-built stage.
    pub fn stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    /// Number of stages.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns `true` if the chain has no stages.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub(crate) fn freeze(self) -> Arc<[Stage]> {
        self.stages.into()
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.stages).finish()
    }
}

/// Builds a [`Chain`] from a list of handlers.
///
/// ```rust,ignore
/// app.on_chain("/items", "POST", chain![decode_stage(JsonCodec), auth, store]);
/// ```
#[macro_export]
macro_rules! chain {
    ($($handler:expr),+ $(,)?) => {
        $crate::Chain::new()$(.handler($handler))+
    };
}
