//! Pipeline error types.
//!
//! Only setup failures surface here. Per-segment render and upload failures
//! are recorded in the ledger and never abort a run.

use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Source media unreadable: {0}")]
    Probe(#[from] vpart_media::ProbeError),

    #[error("Invalid segment plan: {0}")]
    Plan(#[from] vpart_models::PlanError),

    #[error("Failed to read ledger: {0}")]
    LedgerRead(#[source] vpart_ledger::LedgerError),

    #[error("Remote storage unreachable or credentials rejected: {0}")]
    StorageAccess(#[source] vpart_storage::StorageError),
}

impl PipelineError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
