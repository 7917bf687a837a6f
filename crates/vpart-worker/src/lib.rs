//! Resumable segment pipeline.
//!
//! Splits a source into fixed-length segments, renders and uploads each on a
//! bounded worker pool, and records every outcome in an append-only ledger so
//! a restarted run only touches segments not yet uploaded.

pub mod config;
pub mod error;
pub mod ledger_writer;
pub mod logging;
pub mod metrics;
pub mod orchestrator;

pub use config::{LedgerBackend, PipelineConfig};
pub use error::{PipelineError, PipelineResult};
pub use ledger_writer::{LedgerHandle, LedgerWriteError, LedgerWriter, LedgerWriterStats};
pub use logging::{SegmentLogger, SegmentState};
pub use orchestrator::{filter_work_set, Orchestrator, RunSummary};
