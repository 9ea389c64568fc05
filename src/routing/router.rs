//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store compiled routes in registration order
//! - Find the first route whose pattern matches the dialogue path
//! - Bind its params and run its handler through `map`
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) scan in registration order (acceptable for typical route counts)
//! - No match is not an error: the dialogue comes back untouched so the
//!   next handler in the outer chain (usually not-found) can answer

use std::sync::Arc;

use crate::dispatch::{BoxHandler, Dialogue, Handler};
use crate::routing::pattern::{PathParams, Pattern, PatternError};

#[derive(Debug, Clone)]
struct Route {
    pattern: Pattern,
    handler: BoxHandler,
}

/// Ordered mapping from pattern to handler.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `pattern`.
    ///
    /// Malformed patterns and duplicate parameter names are rejected here,
    /// at startup, rather than at request time.
    pub fn route(
        mut self,
        pattern: &str,
        handler: impl Handler + 'static,
    ) -> Result<Self, PatternError> {
        let pattern = Pattern::parse(pattern)?;
        tracing::debug!(pattern = %pattern, index = self.routes.len(), "Route registered");
        self.routes.push(Route {
            pattern,
            handler: BoxHandler::new(handler),
        });
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Registered patterns, in match order.
    pub fn patterns(&self) -> impl Iterator<Item = &Pattern> {
        self.routes.iter().map(|r| &r.pattern)
    }

    /// First route matching `path`, with its extracted params.
    ///
    /// Unknown type tags met along the way are passed to `on_unknown_type`
    /// as `(pattern, tag)`.
    fn lookup(
        &self,
        path: &str,
        mut on_unknown_type: impl FnMut(&Pattern, &str),
    ) -> Option<(&Route, PathParams)> {
        for route in &self.routes {
            match route.pattern.matches(path) {
                Ok(params) => return Some((route, params)),
                Err(mismatch) => {
                    if let Some(tag) = mismatch.unknown_type() {
                        on_unknown_type(&route.pattern, tag);
                    }
                }
            }
        }
        None
    }
}

/// Handler that dispatches through a [`RouteTable`].
#[derive(Debug, Clone)]
pub struct Switch {
    table: Arc<RouteTable>,
}

impl Switch {
    pub fn new(table: RouteTable) -> Self {
        tracing::info!(routes_count = table.len(), "Routing table loaded");
        Self {
            table: Arc::new(table),
        }
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }
}

/// Wrap a route table into a handler.
pub fn switch(table: RouteTable) -> Switch {
    Switch::new(table)
}

impl Handler for Switch {
    fn handle(&self, mut dialogue: Dialogue) -> Dialogue {
        if dialogue.is_terminated() {
            return dialogue;
        }

        let path = dialogue.path().to_string();
        let mut unknown = Vec::new();
        let found = self.table.lookup(&path, |pattern, tag| {
            unknown.push(format!("Unknown type {tag} in pattern {pattern}"));
        });

        for message in unknown {
            dialogue.warn(message);
        }

        match found {
            Some((route, params)) => {
                tracing::debug!(
                    pattern = %route.pattern,
                    path = %path,
                    params = params.len(),
                    "Route matched"
                );
                dialogue.bind_params(params);
                dialogue.map(&route.handler)
            }
            None => {
                tracing::debug!(path = %path, "No route matched");
                dialogue
            }
        }
    }
}
