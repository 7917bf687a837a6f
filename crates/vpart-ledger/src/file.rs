//! JSON-lines file ledger.

use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt, SeekFrom};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use vpart_models::LedgerRecord;

use crate::error::LedgerResult;
use crate::ledger::{completed_labels, Ledger};

/// [`Ledger`] kept as one JSON object per line in a local file.
///
/// Unparseable lines are skipped with a warning so a torn final write from a
/// crash does not block resume. The next append starts on a fresh line so the
/// torn fragment never swallows a new record.
pub struct FileLedger {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every parseable record, in file order.
    pub async fn read_records(&self) -> LedgerResult<Vec<LedgerRecord>> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for (line_no, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<LedgerRecord>(line) {
                Ok(record) => records.push(record),
                Err(e) => warn!(
                    path = %self.path.display(),
                    line = line_no + 1,
                    error = %e,
                    "Skipping unparseable ledger line"
                ),
            }
        }
        Ok(records)
    }
}

#[async_trait]
impl Ledger for FileLedger {
    async fn list_completed_labels(&self) -> LedgerResult<HashSet<String>> {
        let records = self.read_records().await?;
        debug!(path = %self.path.display(), records = records.len(), "Read ledger file");
        Ok(completed_labels(&records))
    }

    async fn append(&self, record: &LedgerRecord) -> LedgerResult<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)
            .await?;

        let len = file.metadata().await?.len();
        if len > 0 {
            let mut last = [0u8; 1];
            file.seek(SeekFrom::Start(len - 1)).await?;
            file.read_exact(&mut last).await?;
            if last[0] != b'\n' {
                warn!(path = %self.path.display(), "Terminating torn ledger line before append");
                line.insert(0, '\n');
            }
        }

        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "file"
    }
}
