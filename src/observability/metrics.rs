//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by method, status, upstream
//! - `proxy_request_duration_seconds` (histogram): latency distribution
//! - `proxy_no_upstream_total` (counter): requests rejected with no live upstream
//! - `proxy_upstream_alive` (gauge): 1=alive, 0=down, per upstream
//!
//! Without an installed recorder every call here is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record a finished request.
pub fn record_request(method: &str, status: u16, upstream: &str, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
        ("upstream", upstream.to_string()),
    ];
    counter!("proxy_requests_total", &labels).increment(1);
    histogram!("proxy_request_duration_seconds", &labels).record(start.elapsed().as_secs_f64());
}

/// Record a request that found no live upstream.
pub fn record_no_upstream() {
    counter!("proxy_no_upstream_total").increment(1);
}

/// Record an upstream's liveness as seen at selection time.
pub fn record_upstream_alive(upstream: &str, alive: bool) {
    gauge!("proxy_upstream_alive", "upstream" => upstream.to_string()).set(if alive { 1.0 } else { 0.0 });
}
