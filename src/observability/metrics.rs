//! Metrics collection and exposition.
//!
//! # Metrics
//! - `quotable_requests_total` (counter): requests by method, status
//! - `quotable_request_duration_seconds` (histogram): latency distribution
//! - `quotable_rate_limited_total` (counter): rejected admissions
//! - `quotable_auth_failures_total` (counter): failed credential resolutions by reason
//! - `quotable_edit_conflicts_total` (counter): stale-version writes
//! - `quotable_limiter_clients` (gauge): tracked client buckets
//! - `quotable_background_tasks_total` (counter): task outcomes by name
//!
//! Recording is a no-op until `init_metrics` installs the exporter.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
    ];
    metrics::counter!("quotable_requests_total", &labels).increment(1);
    metrics::histogram!("quotable_request_duration_seconds", &labels)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited() {
    metrics::counter!("quotable_rate_limited_total").increment(1);
}

pub fn record_auth_failure(reason: &'static str) {
    metrics::counter!("quotable_auth_failures_total", "reason" => reason).increment(1);
}

pub fn record_edit_conflict() {
    metrics::counter!("quotable_edit_conflicts_total").increment(1);
}

pub fn record_limiter_clients(count: usize) {
    metrics::gauge!("quotable_limiter_clients").set(count as f64);
}

pub fn record_task_outcome(task: &'static str, outcome: &'static str) {
    metrics::counter!("quotable_background_tasks_total", "task" => task, "outcome" => outcome)
        .increment(1);
}
