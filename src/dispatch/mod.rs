//! Dispatch core.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → dialogue.rs (one Dialogue per request, owns request + response sink)
//!     → combinator.rs (map / Chain: run handlers while not terminated)
//!     → first writer terminates the dialogue
//!     → transport flushes the frozen response
//! ```
//!
//! # Design Decisions
//! - A dialogue is moved through handlers, never shared between requests
//! - Termination is an explicit phase, checked by every combinator
//! - Handlers are synchronous; blocking work is the handler's business

pub mod combinator;
pub mod dialogue;

pub use combinator::{chain, BoxHandler, Chain, Handler};
pub use dialogue::{Dialogue, Phase, ResponseSink};
