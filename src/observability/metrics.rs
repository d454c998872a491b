//! Metrics collection and exposition.
//!
//! # Metrics
//! - `mirror_probe_total` (counter): finished probes by `result`
//!   (`available` / `unavailable`)
//! - `mirror_descriptor_skipped_total` (counter): descriptor files dropped
//!   during discovery
//!
//! Without an installed recorder every call is a no-op.
//!
//! The exporter lives only as long as the process. A single run usually ends
//! before a scraper polls it, so it is meant for long runs (large mirror sets,
//! slow timeouts); the final run summary is logged either way.

use std::net::SocketAddr;

use metrics::counter;
use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus exporter on `addr`. Must run inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_probe_result(available: bool) {
    let result = if available { "available" } else { "unavailable" };
    counter!("mirror_probe_total", "result" => result).increment(1);
}

pub fn record_descriptor_skipped() {
    counter!("mirror_descriptor_skipped_total").increment(1);
}
