//! Handler composition.
//!
//! A handler takes a dialogue and hands it back. `Dialogue::map` runs a
//! handler only while the dialogue is live, and `Chain` folds `map` over a
//! sequence, so nothing after the first terminating handler ever runs.

use std::fmt;
use std::sync::Arc;

use crate::dispatch::Dialogue;

/// A dialogue-to-dialogue transformation.
///
/// Implemented for every `Fn(Dialogue) -> Dialogue + Send + Sync`, so plain
/// functions and closures are handlers. Configuration is captured at
/// construction; handlers keep no per-request state.
pub trait Handler: Send + Sync {
    fn handle(&self, dialogue: Dialogue) -> Dialogue;
}

impl<F> Handler for F
where
    F: Fn(Dialogue) -> Dialogue + Send + Sync,
{
    fn handle(&self, dialogue: Dialogue) -> Dialogue {
        self(dialogue)
    }
}

/// A shareable, type-erased handler.
#[derive(Clone)]
pub struct BoxHandler(Arc<dyn Handler>);

impl BoxHandler {
    pub fn new(handler: impl Handler + 'static) -> Self {
        Self(Arc::new(handler))
    }
}

impl Handler for BoxHandler {
    fn handle(&self, dialogue: Dialogue) -> Dialogue {
        self.0.handle(dialogue)
    }
}

impl fmt::Debug for BoxHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BoxHandler")
    }
}

impl Dialogue {
    /// Run `handler` unless the dialogue is already terminated.
    pub fn map<H: Handler + ?Sized>(mut self, handler: &H) -> Self {
        if self.is_terminated() {
            return self;
        }
        self.activate();
        handler.handle(self)
    }
}

/// Sequential composition with short-circuit on termination.
#[derive(Clone, Default, Debug)]
pub struct Chain {
    handlers: Vec<BoxHandler>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler to the end of the chain.
    pub fn then(mut self, handler: impl Handler + 'static) -> Self {
        self.handlers.push(BoxHandler::new(handler));
        self
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl Handler for Chain {
    fn handle(&self, dialogue: Dialogue) -> Dialogue {
        self.handlers.iter().fold(dialogue, |d, h| d.map(h))
    }
}

impl FromIterator<BoxHandler> for Chain {
    fn from_iter<I: IntoIterator<Item = BoxHandler>>(iter: I) -> Self {
        Self {
            handlers: iter.into_iter().collect(),
        }
    }
}

/// Build a [`Chain`] from already boxed handlers.
pub fn chain(handlers: impl IntoIterator<Item = BoxHandler>) -> Chain {
    handlers.into_iter().collect()
}

/// Build a [`Chain`] from a list of handlers of any type.
///
/// ```
/// use dialogue::{chain, http::response::not_found_handler, Dialogue};
///
/// let greet = |mut d: Dialogue| {
///     d.log("greeted");
///     d
/// };
/// let handler = chain![greet, not_found_handler()];
/// assert_eq!(handler.len(), 2);
/// ```
#[macro_export]
macro_rules! chain {
    ($($handler:expr),* $(,)?) => {
        $crate::dispatch::Chain::new()$(.then($handler))*
    };
}
