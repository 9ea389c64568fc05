//! Metrics collection and exposition.
//!
//! # Metrics
//! - `dialogue_requests_total` (counter): dispatched requests by status
//! - `dialogue_request_duration_seconds` (histogram): dispatch latency
//!
//! # Design Decisions
//! - Recorded once per request by the host, never inside handlers
//! - Without an installed exporter the macros are no-ops

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

pub const REQUESTS_TOTAL: &str = "dialogue_requests_total";
pub const REQUEST_DURATION: &str = "dialogue_request_duration_seconds";

/// Install the Prometheus exporter with its own HTTP listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Record one finished request.
pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(REQUESTS_TOTAL, "method" => method.to_string(), "status" => status.to_string())
        .increment(1);
    histogram!(REQUEST_DURATION, "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}
