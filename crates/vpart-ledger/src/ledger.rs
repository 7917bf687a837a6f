//! Ledger contract.

use async_trait::async_trait;
use std::collections::HashSet;

use vpart_models::LedgerRecord;

use crate::error::LedgerResult;

/// Durable, append-only record of segment outcomes.
///
/// `append` is not assumed to be safe under concurrent calls; callers
/// serialize writes through a single writer.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Labels that have at least one `uploaded` record.
    async fn list_completed_labels(&self) -> LedgerResult<HashSet<String>>;

    /// Append one record. Records are never mutated once written.
    async fn append(&self, record: &LedgerRecord) -> LedgerResult<()>;

    /// Backend name for logs.
    fn name(&self) -> &'static str;
}

/// Collect the labels of records whose status marks them complete.
pub fn completed_labels<'a, I>(records: I) -> HashSet<String>
where
    I: IntoIterator<Item = &'a LedgerRecord>,
{
    records
        .into_iter()
        .filter(|r| r.status.is_complete())
        .map(|r| r.label.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use vpart_models::SegmentStatus;

    #[test]
    fn test_completed_labels_ignores_failures() {
        let records = vec![
            LedgerRecord::new("PART-1", "part_001.mp4", 40.0, SegmentStatus::Uploaded),
            LedgerRecord::new("PART-2", "part_002.mp4", 40.0, SegmentStatus::UploadFailed),
            LedgerRecord::new("PART-3", "part_003.mp4", 0.0, SegmentStatus::RenderError),
            // A later success for a previously failed label counts
            LedgerRecord::new("PART-2", "part_002.mp4", 40.0, SegmentStatus::Uploaded),
        ];

        let labels = completed_labels(&records);
        assert_eq!(labels.len(), 2);
        assert!(labels.contains("PART-1"));
        assert!(labels.contains("PART-2"));
        assert!(!labels.contains("PART-3"));
    }
}
