//! Authentication handlers.
//!
//! # Data Flow
//! ```text
//! Dialogue (Authorization header)
//!     → basic_auth.rs (chained in front: pass through or 401)
//!     → oauth2.rs (wraps next: verify bearer token, then map(next))
//!     → protected handler
//! ```
//!
//! # Design Decisions
//! - Ordinary handlers: no special support from the dispatch core
//! - Fail closed: any missing or malformed credential terminates with 401
//! - Credentials are captured at construction, never per request

pub mod basic_auth;
pub mod oauth2;

pub use basic_auth::{basic_auth, BasicAuth};
pub use oauth2::{
    oauth2, AcceptAnyToken, Introspection, OAuth2, StaticTokens, TokenError, TokenVerifier,
};
