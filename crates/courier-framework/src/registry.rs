//! Listener registry.
//!
//! Routes are exact, case-sensitive strings. Methods are case-sensitive too.
//! When several listeners share a route and method, the one registered first
//! wins.

use std::fmt;
use std::sync::Arc;

use courier_core::Payload;

use crate::error::{RouteError, RouteResult};
use crate::handler::Stage;

/// Identifies one registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Numeric value of the identifier.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A registered `(route, method)` pairing with its handler chain.
#[derive(Clone)]
pub struct ListenerEntry {
    id: ListenerId,
    route: String,
    method: String,
    chain: Arc<[Stage]>,
    once: bool,
}

impl ListenerEntry {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    pub fn route(&self) -> &str {
        &self.route
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// Returns `true` if the entry is removed after its first dispatch.
    pub fn is_once(&self) -> bool {
        self.once
    }

    pub(crate) fn chain(&self) -> Arc<[Stage]> {
        Arc::clone(&self.chain)
    }
}

impl fmt::Debug for ListenerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerEntry")
            .field("id", &self.id)
            .field("route", &self.route)
            .field("method", &self.method)
            .field("stages", &self.chain.len())
            .field("once", &self.once)
            .finish()
    }
}

/// Ordered collection of listener entries.
#[derive(Debug, Clone, Default)]
pub struct ListenerRegistry {
    entries: Vec<ListenerEntry>,
    next_id: u64,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry and returns its identifier.
    pub fn register(
        &mut self,
        route: impl Into<String>,
        method: impl Into<String>,
        chain: Arc<[Stage]>,
        once: bool,
    ) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.entries.push(ListenerEntry {
            id,
            route: route.into(),
            method: method.into(),
            chain,
            once,
        });
        id
    }

    /// Removes the entry with `id`, if it is still registered.
    pub fn remove(&mut self, id: ListenerId) -> Option<ListenerEntry> {
        let index = self.entries.iter().position(|entry| entry.id == id)?;
        Some(self.entries.remove(index))
    }

    pub fn contains(&self, id: ListenerId) -> bool {
        self.entries.iter().any(|entry| entry.id == id)
    }

    /// Returns `true` if any listener is registered on `route`.
    pub fn has_route(&self, route: &str) -> bool {
        self.entries.iter().any(|entry| entry.route == route)
    }

    /// Checks that at least one listener exists for `route`, whatever its method.
    pub fn validate_route(&self, route: &str) -> RouteResult<()> {
        if self.has_route(route) {
            Ok(())
        } else {
            Err(RouteError::UnknownRoute)
        }
    }

    /// Entries registered on `route`, in registration order.
    pub fn listeners_for_route<'a, 'r>(
        &'a self,
        route: &'r str,
    ) -> impl Iterator<Item = &'a ListenerEntry> {
        self.entries.iter().filter(move |entry| entry.route == route)
    }

    /// Finds the first entry matching `route` and the method in `headers`.
    pub fn resolve(&self, headers: &Payload, route: &str) -> RouteResult<&ListenerEntry> {
        let method = headers.method().ok_or(RouteError::MissingMethod)?;
        self.listeners_for_route(route)
            .find(|entry| entry.method == method)
            .ok_or(RouteError::NoListener)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ListenerEntry> {
        self.entries.iter()
    }
}
