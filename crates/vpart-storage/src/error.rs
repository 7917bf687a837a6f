//! Storage error types.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during a single storage call.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to configure storage client: {0}")]
    ConfigError(String),

    #[error("Local file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Network failure, timeout or unreadable response
    #[error("Transient upload failure: {0}")]
    Transient(String),

    #[error("Upload rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },
}

impl StorageError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn transient(msg: impl Into<String>) -> Self {
        Self::Transient(msg.into())
    }

    /// Classify a failed HTTP response.
    pub fn from_http_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            429 | 500..=599 => Self::Transient(format!("HTTP {}: {}", status, message)),
            _ => Self::Rejected { status, message },
        }
    }

    /// Whether retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, StorageError::Transient(_))
    }
}

/// Upload failure after the retry policy gave up.
#[derive(Debug, Error)]
#[error("Upload failed after {attempts} attempt(s): {source}")]
pub struct UploadError {
    pub attempts: u32,
    #[source]
    pub source: StorageError,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_classification() {
        assert!(StorageError::from_http_status(429, "slow down").is_transient());
        assert!(StorageError::from_http_status(503, "unavailable").is_transient());
        assert!(!StorageError::from_http_status(403, "forbidden").is_transient());
        assert!(!StorageError::from_http_status(404, "no bucket").is_transient());
    }

    #[test]
    fn test_permanent_kinds() {
        assert!(!StorageError::FileNotFound(PathBuf::from("x.mp4")).is_transient());
        assert!(!StorageError::config_error("missing").is_transient());
        assert!(StorageError::transient("reset by peer").is_transient());
    }

    #[test]
    fn test_upload_error_message() {
        let err = UploadError {
            attempts: 3,
            source: StorageError::transient("timeout"),
        };
        assert_eq!(
            err.to_string(),
            "Upload failed after 3 attempt(s): Transient upload failure: timeout"
        );
    }
}
