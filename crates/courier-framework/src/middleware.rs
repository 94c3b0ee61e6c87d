//! Middleware hooks.
//!
//! Middleware runs on every dispatch cycle, in registration order, before
//! routing. Each middleware may also rewrite outgoing payloads just before a
//! response is handed to the transport.

use std::fmt;
use std::sync::Arc;

use courier_core::{Agent, MessageKind, Payload};

use crate::error::MiddlewareResult;
use crate::request::Request;
use crate::response::Response;

/// Result of a middleware's inbound hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MiddlewareOutcome {
    /// Keep going.
    Continue,
    /// Reject the request; the caller receives a 500 with this message, or a
    /// generic one when `None`.
    Reject(Option<String>),
}

impl MiddlewareOutcome {
    /// Rejection with a specific message.
    pub fn reject(msg: impl Into<String>) -> Self {
        Self::Reject(Some(msg.into()))
    }

    pub fn is_reject(&self) -> bool {
        matches!(self, Self::Reject(_))
    }
}

/// Payloads of a response or status message about to be delivered.
///
/// Status messages carry no arguments.
#[derive(Debug, Clone)]
pub struct Outgoing {
    kind: MessageKind,
    reply_to: Agent,
    /// Response headers.
    pub headers: Payload,
    /// Send arguments.
    pub args: Vec<Payload>,
}

impl Outgoing {
    pub(crate) fn new(
        kind: MessageKind,
        reply_to: Agent,
        headers: Payload,
        args: Vec<Payload>,
    ) -> Self {
        Self {
            kind,
            reply_to,
            headers,
            args,
        }
    }

    /// Which message is being sent.
    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    /// Where the response is going.
    pub fn reply_to(&self) -> &Agent {
        &self.reply_to
    }
}

/// A middleware.
///
/// Both hooks have no-op defaults, so an implementation only overrides what it
/// needs.
pub trait Middleware: Send + Sync + 'static {
    /// Name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Runs on every inbound request before routing.
    fn inbound(&self, _req: &mut Request, _res: &Response) -> MiddlewareOutcome {
        MiddlewareOutcome::Continue
    }

    /// Runs on every outgoing response and status message before it reaches
    /// the transport.
    fn outbound(&self, _out: &mut Outgoing) -> MiddlewareResult<()> {
        Ok(())
    }
}

/// Shared middleware handle.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// Middleware built from an inbound closure.
pub struct FnMiddleware<F> {
    name: String,
    func: F,
}

impl<F> FnMiddleware<F>
where
    F: Fn(&mut Request, &Response) -> MiddlewareOutcome + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> Middleware for FnMiddleware<F>
where
    F: Fn(&mut Request, &Response) -> MiddlewareOutcome + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn inbound(&self, req: &mut Request, res: &Response) -> MiddlewareOutcome {
        (self.func)(req, res)
    }
}

impl<F> fmt::Debug for FnMiddleware<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnMiddleware").field("name", &self.name).finish()
    }
}
