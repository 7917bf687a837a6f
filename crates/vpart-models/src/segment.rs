//! Segment descriptors and labels.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Build the ledger label for a zero-based segment index.
///
/// Labels are 1-based so the first segment is never labeled `"{prefix}0"`.
pub fn label_for(prefix: &str, index: u32) -> String {
    format!("{}{}", prefix, index + 1)
}

/// One fixed-length slice of the source media.
///
/// Produced once by the planner and never mutated afterwards. The label is
/// the idempotency key used by the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentDescriptor {
    /// Zero-based position in the plan
    pub index: u32,
    /// Start offset into the source, in seconds
    pub start_offset: f64,
    /// Nominal length in seconds (the last segment may render shorter)
    pub nominal_length: f64,
    /// Deterministic label derived from `index`
    pub label: String,
}

impl SegmentDescriptor {
    /// Create a descriptor with a label derived from `prefix` and `index`.
    pub fn new(index: u32, segment_length: f64, prefix: &str) -> Self {
        Self {
            index,
            start_offset: f64::from(index) * segment_length,
            nominal_length: segment_length,
            label: label_for(prefix, index),
        }
    }

    /// 1-based sequence number.
    pub fn number(&self) -> u32 {
        self.index + 1
    }

    /// Filename of the finalized artifact, e.g. `part_003.mp4`.
    pub fn output_filename(&self) -> String {
        format!("part_{:03}.mp4", self.number())
    }

    /// Filename of the pre-finalize artifact.
    pub fn intermediate_filename(&self) -> String {
        format!("part_{:03}.transform.mp4", self.number())
    }

    /// Length this segment covers given the source's total duration.
    pub fn expected_length(&self, total_duration: f64) -> f64 {
        (total_duration - self.start_offset)
            .min(self.nominal_length)
            .max(0.0)
    }
}

impl fmt::Display for SegmentDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (#{} @ {:.3}s, {:.3}s)",
            self.label, self.index, self.start_offset, self.nominal_length
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_is_one_based() {
        assert_eq!(label_for("PART-", 0), "PART-1");
        assert_eq!(label_for("PART-", 9), "PART-10");
    }

    #[test]
    fn test_filenames() {
        let seg = SegmentDescriptor::new(2, 40.0, "PART-");
        assert_eq!(seg.output_filename(), "part_003.mp4");
        assert_eq!(seg.intermediate_filename(), "part_003.transform.mp4");
        assert_eq!(seg.label, "PART-3");
        assert!((seg.start_offset - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_expected_length_clamps_last_segment() {
        let seg = SegmentDescriptor::new(2, 40.0, "PART-");
        assert!((seg.expected_length(95.0) - 15.0).abs() < 1e-9);
        assert!((seg.expected_length(200.0) - 40.0).abs() < 1e-9);
        assert_eq!(seg.expected_length(60.0), 0.0);
    }
}
