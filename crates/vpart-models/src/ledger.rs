//! Ledger records and segment terminal statuses.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Terminal outcome of one segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentStatus {
    Uploaded,
    UploadFailed,
    RenderError,
    FinalizeError,
}

impl SegmentStatus {
    pub const ALL: &'static [SegmentStatus] = &[
        SegmentStatus::Uploaded,
        SegmentStatus::UploadFailed,
        SegmentStatus::RenderError,
        SegmentStatus::FinalizeError,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentStatus::Uploaded => "uploaded",
            SegmentStatus::UploadFailed => "upload_failed",
            SegmentStatus::RenderError => "render_error",
            SegmentStatus::FinalizeError => "finalize_error",
        }
    }

    /// Whether this status marks the segment as done for resume purposes.
    pub fn is_complete(&self) -> bool {
        matches!(self, SegmentStatus::Uploaded)
    }
}

impl fmt::Display for SegmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SegmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "uploaded" => Ok(SegmentStatus::Uploaded),
            "upload_failed" => Ok(SegmentStatus::UploadFailed),
            "render_error" => Ok(SegmentStatus::RenderError),
            "finalize_error" => Ok(SegmentStatus::FinalizeError),
            other => Err(format!("unknown segment status: {}", other)),
        }
    }
}

/// One append-only ledger row.
///
/// Column order is significant for compatibility with tabular backends:
/// `label, filename, durationSeconds, status[, remoteUrlOrId]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerRecord {
    pub label: String,
    pub filename: String,
    pub duration_seconds: f64,
    pub status: SegmentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<String>,
}

impl LedgerRecord {
    pub fn new(
        label: impl Into<String>,
        filename: impl Into<String>,
        duration_seconds: f64,
        status: SegmentStatus,
    ) -> Self {
        Self {
            label: label.into(),
            filename: filename.into(),
            duration_seconds,
            status,
            remote: None,
        }
    }

    pub fn with_remote(mut self, remote: impl Into<String>) -> Self {
        self.remote = Some(remote.into());
        self
    }

    /// Serialize to an ordered row of cells.
    pub fn to_row(&self) -> Vec<String> {
        let mut row = vec![
            self.label.clone(),
            self.filename.clone(),
            format_seconds(self.duration_seconds),
            self.status.as_str().to_string(),
        ];
        if let Some(remote) = &self.remote {
            row.push(remote.clone());
        }
        row
    }

    /// Parse an ordered row of cells. Returns `None` for header or malformed rows.
    pub fn from_row(row: &[String]) -> Option<Self> {
        if row.len() < 4 {
            return None;
        }
        let duration_seconds = row[2].trim().parse().ok()?;
        let status = row[3].parse().ok()?;
        Some(Self {
            label: row[0].trim().to_string(),
            filename: row[1].trim().to_string(),
            duration_seconds,
            status,
            remote: row.get(4).filter(|s| !s.is_empty()).cloned(),
        })
    }
}

/// Format seconds without a trailing `.000` for whole values.
fn format_seconds(secs: f64) -> String {
    if secs.fract() == 0.0 {
        format!("{}", secs as i64)
    } else {
        format!("{:.3}", secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_column_order() {
        let record = LedgerRecord::new("PART-3", "part_003.mp4", 15.0, SegmentStatus::Uploaded)
            .with_remote("clips/part_003.mp4");
        assert_eq!(
            record.to_row(),
            vec!["PART-3", "part_003.mp4", "15", "uploaded", "clips/part_003.mp4"]
        );
    }

    #[test]
    fn test_row_without_remote_has_four_columns() {
        let record = LedgerRecord::new("PART-1", "part_001.mp4", 39.98, SegmentStatus::RenderError);
        let row = record.to_row();
        assert_eq!(row.len(), 4);
        assert_eq!(row[2], "39.980");
        assert_eq!(LedgerRecord::from_row(&row), Some(record));
    }

    #[test]
    fn test_from_row_rejects_header_and_short_rows() {
        let header: Vec<String> = ["label", "filename", "durationSeconds", "status"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert!(LedgerRecord::from_row(&header).is_none());
        assert!(LedgerRecord::from_row(&["PART-1".to_string()]).is_none());
    }

    #[test]
    fn test_only_uploaded_is_complete() {
        for status in SegmentStatus::ALL {
            assert_eq!(status.is_complete(), *status == SegmentStatus::Uploaded);
            assert_eq!(status.as_str().parse::<SegmentStatus>().unwrap(), *status);
        }
    }
}
