//! Source media handle.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A readable local media file and its probed duration.
///
/// Immutable once probed; owned by the orchestrator for the run's lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceMedia {
    path: PathBuf,
    duration_seconds: f64,
}

impl SourceMedia {
    pub fn new(path: impl Into<PathBuf>, duration_seconds: f64) -> Self {
        Self {
            path: path.into(),
            duration_seconds: duration_seconds.max(0.0),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn duration_seconds(&self) -> f64 {
        self.duration_seconds
    }
}
