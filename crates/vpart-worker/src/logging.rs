//! Structured segment logging.
//!
//! Every lifecycle transition of a segment is logged with its label and
//! index so a run can be reconstructed from the log alone.

use std::fmt;
use tracing::{error, info, warn, Span};

use vpart_models::{SegmentDescriptor, SegmentStatus};

/// Per-segment lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentState {
    Planned,
    /// Already `uploaded` in the ledger
    Skipped,
    Rendering,
    Rendered,
    Uploading,
    Uploaded,
    UploadFailed,
    RenderFailed,
    /// Terminal: the outcome record has been appended
    Ledgered,
}

impl SegmentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentState::Planned => "planned",
            SegmentState::Skipped => "skipped",
            SegmentState::Rendering => "rendering",
            SegmentState::Rendered => "rendered",
            SegmentState::Uploading => "uploading",
            SegmentState::Uploaded => "uploaded",
            SegmentState::UploadFailed => "upload_failed",
            SegmentState::RenderFailed => "render_failed",
            SegmentState::Ledgered => "ledgered",
        }
    }
}

impl fmt::Display for SegmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Segment logger with the label and index attached to every line.
#[derive(Debug, Clone)]
pub struct SegmentLogger {
    label: String,
    index: u32,
}

impl SegmentLogger {
    pub fn new(segment: &SegmentDescriptor) -> Self {
        Self {
            label: segment.label.clone(),
            index: segment.index,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Log entry into `state`.
    pub fn transition(&self, state: SegmentState) {
        info!(
            label = %self.label,
            index = self.index,
            state = %state,
            "Segment {}", state
        );
    }

    pub fn log_skipped(&self) {
        info!(
            label = %self.label,
            index = self.index,
            state = %SegmentState::Skipped,
            "Skipping segment, already ledgered"
        );
    }

    pub fn log_render_failed(&self, stage: &str, error: &dyn std::error::Error) {
        error!(
            label = %self.label,
            index = self.index,
            state = %SegmentState::RenderFailed,
            stage,
            error = %error,
            "Segment render failed"
        );
    }

    pub fn log_upload_failed(&self, attempts: u32, error: &dyn std::error::Error) {
        error!(
            label = %self.label,
            index = self.index,
            state = %SegmentState::UploadFailed,
            attempts,
            error = %error,
            "Segment upload failed"
        );
    }

    pub fn log_ledgered(&self, status: SegmentStatus) {
        info!(
            label = %self.label,
            index = self.index,
            state = %SegmentState::Ledgered,
            status = %status,
            "Segment ledgered"
        );
    }

    pub fn log_ledger_failed(&self, status: SegmentStatus, error: &dyn std::error::Error) {
        warn!(
            label = %self.label,
            index = self.index,
            status = %status,
            error = %error,
            "Segment outcome not ledgered"
        );
    }

    /// Span wrapping the segment's whole lifecycle.
    pub fn create_span(&self) -> Span {
        tracing::info_span!("segment", label = %self.label, index = self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logger_carries_label() {
        let segment = SegmentDescriptor::new(4, 40.0, "PART-");
        let logger = SegmentLogger::new(&segment);
        assert_eq!(logger.label(), "PART-5");
    }

    #[test]
    fn test_state_names() {
        assert_eq!(SegmentState::UploadFailed.to_string(), "upload_failed");
        assert_eq!(SegmentState::Ledgered.as_str(), "ledgered");
    }
}
