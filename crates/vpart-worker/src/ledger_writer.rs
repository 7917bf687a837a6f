//! Single-writer ledger actor.
//!
//! Segment workers run in parallel but ledger backends are not assumed to
//! tolerate concurrent appends, so every append goes through one task that
//! drains a channel in order. Each append is acknowledged to its sender.

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use vpart_ledger::{Ledger, LedgerError};
use vpart_models::LedgerRecord;

use crate::metrics::record_ledger_write_failure;

const CHANNEL_CAPACITY: usize = 64;

/// Why an append did not land.
#[derive(Debug, Error)]
pub enum LedgerWriteError {
    #[error("Ledger rejected append: {0}")]
    Rejected(#[from] LedgerError),

    #[error("Ledger writer has stopped")]
    WriterClosed,
}

/// Totals reported when the writer shuts down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerWriterStats {
    pub appended: usize,
    pub failed: usize,
}

struct AppendRequest {
    record: LedgerRecord,
    ack: oneshot::Sender<Result<(), LedgerError>>,
}

/// Cloneable sender side of the writer.
#[derive(Clone)]
pub struct LedgerHandle {
    tx: mpsc::Sender<AppendRequest>,
}

impl LedgerHandle {
    /// Queue `record` and wait until the writer has attempted it.
    pub async fn append(&self, record: LedgerRecord) -> Result<(), LedgerWriteError> {
        let (ack, done) = oneshot::channel();
        self.tx
            .send(AppendRequest { record, ack })
            .await
            .map_err(|_| LedgerWriteError::WriterClosed)?;

        match done.await {
            Ok(result) => result.map_err(LedgerWriteError::from),
            Err(_) => Err(LedgerWriteError::WriterClosed),
        }
    }
}

/// Spawner for the writer task.
pub struct LedgerWriter;

impl LedgerWriter {
    /// Start the writer. It exits once every [`LedgerHandle`] is dropped.
    pub fn spawn(ledger: Arc<dyn Ledger>) -> (LedgerHandle, JoinHandle<LedgerWriterStats>) {
        let (tx, mut rx) = mpsc::channel::<AppendRequest>(CHANNEL_CAPACITY);

        let task = tokio::spawn(async move {
            let mut stats = LedgerWriterStats::default();

            while let Some(AppendRequest { record, ack }) = rx.recv().await {
                let result = ledger.append(&record).await;
                match &result {
                    Ok(()) => {
                        stats.appended += 1;
                        debug!(label = %record.label, status = %record.status, "Ledger append ok");
                    }
                    Err(e) => {
                        stats.failed += 1;
                        record_ledger_write_failure();
                        warn!(
                            label = %record.label,
                            status = %record.status,
                            backend = ledger.name(),
                            error = %e,
                            "Ledger append failed"
                        );
                    }
                }
                // The sender may have gone away; the append still happened
                let _ = ack.send(result);
            }

            stats
        });

        (LedgerHandle { tx }, task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vpart_ledger::MemoryLedger;
    use vpart_models::SegmentStatus;

    fn record(n: u32) -> LedgerRecord {
        LedgerRecord::new(
            format!("PART-{}", n),
            format!("part_{:03}.mp4", n),
            40.0,
            SegmentStatus::Uploaded,
        )
    }

    #[tokio::test]
    async fn test_appends_are_serialized() {
        let ledger = Arc::new(MemoryLedger::new());
        let (handle, task) = LedgerWriter::spawn(ledger.clone());

        let mut joins = Vec::new();
        for n in 1..=20 {
            let handle = handle.clone();
            joins.push(tokio::spawn(async move { handle.append(record(n)).await }));
        }
        for join in joins {
            join.await.unwrap().unwrap();
        }
        drop(handle);

        let stats = task.await.unwrap();
        assert_eq!(stats, LedgerWriterStats { appended: 20, failed: 0 });
        assert_eq!(ledger.records().len(), 20);
        assert_eq!(ledger.max_concurrent_appends(), 1);
    }

    #[tokio::test]
    async fn test_failures_are_acked_and_counted() {
        let ledger = Arc::new(MemoryLedger::new());
        ledger.fail_appends(true);
        let (handle, task) = LedgerWriter::spawn(ledger.clone());

        let err = handle.append(record(1)).await.unwrap_err();
        assert!(matches!(err, LedgerWriteError::Rejected(_)));
        drop(handle);

        let stats = task.await.unwrap();
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.appended, 0);
    }
}
