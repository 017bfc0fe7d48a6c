//! Metrics collection and exposition.
//!
//! # Metrics
//! - `pool_attempts_total` (counter): attempts by backend, status
//! - `pool_attempt_duration_seconds` (histogram): per-attempt latency by backend
//! - `pool_retries_total` (counter): attempts that led to another backend being tried
//! - `pool_exhausted_total` (counter): calls that ended without a usable response, by reason
//! - `pool_backend_score` (gauge): combined score after the latest rescore
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - Prometheus exposition is opt-in from the host binary

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_attempt(backend: &str, status: u16, elapsed: Duration) {
    metrics::counter!(
        "pool_attempts_total",
        "backend" => backend.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("pool_attempt_duration_seconds", "backend" => backend.to_string())
        .record(elapsed.as_secs_f64());
}

pub fn record_retry() {
    metrics::counter!("pool_retries_total").increment(1);
}

pub fn record_exhausted(reason: &'static str) {
    metrics::counter!("pool_exhausted_total", "reason" => reason).increment(1);
}

pub fn record_backend_score(backend: &str, score: f64) {
    metrics::gauge!("pool_backend_score", "backend" => backend.to_string()).set(score);
}
