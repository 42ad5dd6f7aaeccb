//! Named routes pairing a target host with an exchange function.
//!
//! Entries are immutable once published: `modify` builds a replacement entry
//! and swaps the `Arc`, so a reader holding an entry from `lookup` always
//! sees a consistent pre- or post-update value.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::domain::ports::SharedExchange;

/// Immutable route entry.
#[derive(Clone)]
pub struct RouteEntry {
    pub name: String,
    /// Target host or URI; empty means not configured.
    pub target: String,
    pub exchange: SharedExchange,
}

impl RouteEntry {
    pub fn is_configured(&self) -> bool {
        !self.target.is_empty()
    }
}

impl std::fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteEntry")
            .field("name", &self.name)
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

/// Thread-safe registry of routes.
pub struct RouteTable {
    routes: RwLock<HashMap<String, Arc<RouteEntry>>>,
    default_exchange: SharedExchange,
}

impl RouteTable {
    /// `default_exchange` is installed on routes created without one.
    pub fn new(default_exchange: SharedExchange) -> Self {
        Self {
            routes: RwLock::new(HashMap::new()),
            default_exchange,
        }
    }

    /// Table holding one unconfigured route `name`.
    pub fn with_route(name: &str, default_exchange: SharedExchange) -> Self {
        let table = Self::new(default_exchange);
        table.modify(name, None, None);
        table
    }

    /// Upsert a route. `None` leaves that dimension unchanged; a new route
    /// starts with an empty target and the default exchange.
    pub fn modify(&self, name: &str, target: Option<&str>, exchange: Option<SharedExchange>) {
        let mut routes = self.routes.write().unwrap_or_else(PoisonError::into_inner);
        let entry = match routes.get(name) {
            Some(current) => RouteEntry {
                name: current.name.clone(),
                target: target.map_or_else(|| current.target.clone(), str::to_string),
                exchange: exchange.unwrap_or_else(|| current.exchange.clone()),
            },
            None => RouteEntry {
                name: name.to_string(),
                target: target.unwrap_or_default().to_string(),
                exchange: exchange.unwrap_or_else(|| self.default_exchange.clone()),
            },
        };
        routes.insert(name.to_string(), Arc::new(entry));
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<RouteEntry>> {
        self.routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }
}
