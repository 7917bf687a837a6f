//! In-memory ledger.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use vpart_models::LedgerRecord;

use crate::error::{LedgerError, LedgerResult};
use crate::ledger::{completed_labels, Ledger};

/// [`Ledger`] held in process memory. Records are lost on exit.
#[derive(Default)]
pub struct MemoryLedger {
    records: Mutex<Vec<LedgerRecord>>,
    fail_appends: AtomicBool,
    fail_reads: AtomicBool,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with existing records, as if left by an earlier run.
    pub fn with_records(records: impl IntoIterator<Item = LedgerRecord>) -> Self {
        let ledger = Self::new();
        if let Ok(mut guard) = ledger.records.lock() {
            guard.extend(records);
        }
        ledger
    }

    /// Make every subsequent `append` fail.
    pub fn fail_appends(&self, fail: bool) {
        self.fail_appends.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent `list_completed_labels` fail.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of all records in append order.
    pub fn records(&self) -> Vec<LedgerRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Highest number of `append` calls observed running at once.
    pub fn max_concurrent_appends(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn list_completed_labels(&self) -> LedgerResult<HashSet<String>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(LedgerError::from_http_status(503, "ledger unavailable"));
        }
        let records = self.records();
        Ok(completed_labels(&records))
    }

    async fn append(&self, record: &LedgerRecord) -> LedgerResult<()> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        // Widen the window in which overlapping appends would be visible
        tokio::task::yield_now().await;

        let result = if self.fail_appends.load(Ordering::SeqCst) {
            Err(LedgerError::from_http_status(500, "append rejected"))
        } else {
            match self.records.lock() {
                Ok(mut records) => {
                    records.push(record.clone());
                    Ok(())
                }
                Err(_) => Err(LedgerError::InvalidResponse("ledger lock poisoned".into())),
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vpart_models::SegmentStatus;

    #[tokio::test]
    async fn test_seeded_records() {
        let ledger = MemoryLedger::with_records([
            LedgerRecord::new("PART-1", "part_001.mp4", 40.0, SegmentStatus::Uploaded),
            LedgerRecord::new("PART-2", "part_002.mp4", 40.0, SegmentStatus::RenderError),
        ]);
        let labels = ledger.list_completed_labels().await.unwrap();
        assert_eq!(labels, HashSet::from(["PART-1".to_string()]));
    }

    #[tokio::test]
    async fn test_failure_modes() {
        let ledger = MemoryLedger::new();
        ledger.fail_appends(true);
        let record = LedgerRecord::new("PART-1", "part_001.mp4", 40.0, SegmentStatus::Uploaded);
        assert!(ledger.append(&record).await.is_err());
        assert!(ledger.records().is_empty());

        ledger.fail_reads(true);
        assert!(ledger.list_completed_labels().await.is_err());
    }
}
