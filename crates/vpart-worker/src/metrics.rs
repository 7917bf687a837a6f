//! Pipeline metrics.

use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use vpart_models::SegmentStatus;

/// Metric name constants.
pub mod names {
    /// Segments reaching a terminal status, by status.
    pub const SEGMENTS_TOTAL: &str = "vpart_segments_total";

    /// Segments skipped because the ledger already lists them.
    pub const SEGMENTS_SKIPPED_TOTAL: &str = "vpart_segments_skipped_total";

    /// Ledger appends that failed.
    pub const LEDGER_WRITE_FAILURES_TOTAL: &str = "vpart_ledger_write_failures_total";
}

pub fn record_segment(status: SegmentStatus) {
    counter!(names::SEGMENTS_TOTAL, "status" => status.as_str()).increment(1);
}

pub fn record_skipped(count: usize) {
    counter!(names::SEGMENTS_SKIPPED_TOTAL).increment(count as u64);
}

pub fn record_ledger_write_failure() {
    counter!(names::LEDGER_WRITE_FAILURES_TOTAL).increment(1);
}

/// Install the Prometheus recorder and return a handle for rendering snapshots.
pub fn install_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {}", e))
}
