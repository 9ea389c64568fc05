//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, histograms)
//!
//! Per request, the dialogue log trail travels with the response and is
//! emitted at debug level by the host once the request is done.
//! ```

pub mod logging;
pub mod metrics;
