//! Ledger metrics.

use metrics::{counter, histogram};

/// Metric name constants.
pub mod names {
    /// Ledger backend requests by operation and status.
    pub const REQUESTS_TOTAL: &str = "vpart_ledger_requests_total";

    /// Retried ledger requests by operation.
    pub const RETRIES_TOTAL: &str = "vpart_ledger_retries_total";

    /// Ledger request latency in seconds by operation.
    pub const LATENCY_SECONDS: &str = "vpart_ledger_latency_seconds";
}

/// Record metrics for a completed ledger request.
pub fn record_request(operation: &str, status: u16, latency_ms: f64) {
    counter!(
        names::REQUESTS_TOTAL,
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        names::LATENCY_SECONDS,
        "operation" => operation.to_string()
    )
    .record(latency_ms / 1000.0);
}

/// Record a retry attempt.
pub fn record_retry(operation: &str) {
    counter!(
        names::RETRIES_TOTAL,
        "operation" => operation.to_string()
    )
    .increment(1);
}
