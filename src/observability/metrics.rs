//! Metrics collection and exposition.
//!
//! # Metrics
//! - `backend_requests_total` (counter): requests by route, status
//! - `backend_request_duration_seconds` (histogram): latency by route
//! - `backend_rate_limited_total` (counter): requests rejected with 429
//! - `backend_upstream_failures_total` (counter): failed outbound calls
//!
//! Recording goes through the `metrics` facade and is a no-op until a
//! recorder is installed by [`init_metrics`].

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(route: &str, status: u16, start: Instant) {
    metrics::counter!(
        "backend_requests_total",
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("backend_request_duration_seconds", "route" => route.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited() {
    metrics::counter!("backend_rate_limited_total").increment(1);
}

pub fn record_upstream_failure() {
    metrics::counter!("backend_upstream_failures_total").increment(1);
}
