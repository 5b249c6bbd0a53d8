//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define gateway metrics (requests, latency, contained panics, memory)
//! - Expose a Prometheus-compatible exposition document
//!
//! # Metrics
//! - `http_requests_total` (counter): total requests by method, status
//! - `http_request_duration_seconds` (histogram): latency distribution
//! - `http_requests_panicked_total` (counter): handler panics contained
//! - `process_memory_*_bytes` (gauges): memory telemetry pulse values

use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

use crate::observability::memory::MemorySnapshot;

pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4";

#[derive(Debug, thiserror::Error)]
#[error("failed to install metrics recorder: {0}")]
pub struct MetricsError(#[from] BuildError);

/// Install the process-wide Prometheus recorder and return its render handle.
///
/// Call once from the entry point; the recorder cannot be replaced afterwards.
pub fn install_recorder() -> Result<PrometheusHandle, MetricsError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    describe();
    Ok(handle)
}

/// A handle backed by a recorder that is not installed globally.
///
/// Renders an empty document; used where a gateway is built without the
/// process-wide recorder (tests, embedding).
pub fn detached_handle() -> PrometheusHandle {
    PrometheusBuilder::new().build_recorder().handle()
}

fn describe() {
    metrics::describe_counter!("http_requests_total", "Total HTTP requests by method and status");
    metrics::describe_histogram!(
        "http_request_duration_seconds",
        metrics::Unit::Seconds,
        "HTTP request latency"
    );
    metrics::describe_counter!(
        "http_requests_panicked_total",
        "HTTP requests whose handler panicked"
    );
    metrics::describe_gauge!(
        "process_memory_alloc_bytes",
        metrics::Unit::Bytes,
        "Bytes currently allocated"
    );
    metrics::describe_gauge!(
        "process_memory_total_alloc_bytes",
        metrics::Unit::Bytes,
        "Cumulative bytes allocated"
    );
    metrics::describe_gauge!(
        "process_memory_sys_bytes",
        metrics::Unit::Bytes,
        "Virtual memory obtained from the system"
    );
    metrics::describe_gauge!(
        "process_memory_resident_bytes",
        metrics::Unit::Bytes,
        "Resident set size"
    );
}

/// Record a completed request.
pub fn record_request(method: &str, status: u16, start_time: Instant) {
    let duration = start_time.elapsed().as_secs_f64();

    metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    metrics::histogram!("http_request_duration_seconds", "method" => method.to_string())
        .record(duration);
}

/// Record a request whose handler panicked.
pub fn record_panic(method: &str) {
    metrics::counter!("http_requests_panicked_total", "method" => method.to_string()).increment(1);
}

/// Publish a memory snapshot as gauges.
pub fn record_memory(snapshot: &MemorySnapshot) {
    metrics::gauge!("process_memory_alloc_bytes").set(snapshot.alloc as f64);
    metrics::gauge!("process_memory_total_alloc_bytes").set(snapshot.total_alloc as f64);
    metrics::gauge!("process_memory_sys_bytes").set(snapshot.sys_alloc as f64);
    metrics::gauge!("process_memory_resident_bytes").set(snapshot.resident as f64);
}
