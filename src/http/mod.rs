//! HTTP host subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing, timeout)
//!     → request.rs (header/body limits, buffer body)
//!     → Dialogue::new → root handler (routing, auth, app)
//!     → response.rs (writers terminate the dialogue)
//!     → server.rs flushes the frozen response
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::{HttpServer, ServeError};
