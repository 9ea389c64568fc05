//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route registration (at startup):
//!     "/user/<id:uuid4>" + handler
//!     → pattern.rs (compile, reject malformed patterns)
//!     → router.rs (append to RouteTable, registration order)
//!
//! Incoming Dialogue (path)
//!     → router.rs (Switch: walk table in order)
//!     → pattern.rs (structural + per-segment match)
//!     → value.rs (parse typed segments)
//!     → first match: bind params, map(handler)
//!     → no match: dialogue returned untouched
//! ```
//!
//! # Design Decisions
//! - Route tables are immutable once built; shared via Arc
//! - Deterministic: first registered matching route wins
//! - No regex, no wildcards; typed segments only

pub mod pattern;
pub mod router;
pub mod value;

pub use pattern::{Mismatch, PathParams, Pattern, PatternError, Segment};
pub use router::{switch, RouteTable, Switch};
pub use value::{ParseError, TypeTag, TypedValue};
