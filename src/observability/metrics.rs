//! Metrics collection and exposition.
//!
//! # Metrics
//! - `endpoint_requests_total` (counter): outcomes by endpoint, status, success
//! - `endpoint_time_taken_ms` (histogram): wall-clock latency
//! - `endpoint_process_time_taken_ms` (histogram): CPU time of the process
//!   while the call was in flight

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

use crate::observability::stats::{OutcomeRecord, StatsRecorder};

/// Initialize the Prometheus exporter.
pub fn init_metrics(addr: SocketAddr) {
    let builder = PrometheusBuilder::new();
    if let Err(e) = builder.with_http_listener(addr).install() {
        tracing::error!(error = %e, "Failed to install Prometheus recorder");
    } else {
        tracing::info!(address = %addr, "Metrics exporter listening");
    }
}

/// [`StatsRecorder`] that forwards outcome records to the `metrics` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct MetricsRecorder;

impl StatsRecorder for MetricsRecorder {
    fn update_stats(&self, record: &OutcomeRecord) {
        let labels = [
            ("endpoint", record.endpoint.clone()),
            ("status", record.status.to_string()),
            ("success", record.success.to_string()),
            ("server_type", record.server_type.to_string()),
        ];

        let endpoint = [("endpoint", record.endpoint.clone())];

        counter!("endpoint_requests_total", &labels).increment(1);
        histogram!("endpoint_time_taken_ms", &endpoint).record(record.time_taken_ms as f64);
        histogram!("endpoint_process_time_taken_ms", &endpoint)
            .record(record.process_time_taken_ms as f64);
    }
}
