//! Ledger error types.

use thiserror::Error;

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Errors that can occur while reading or appending ledger records.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Ledger configuration error: {0}")]
    ConfigError(String),

    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limited")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("Server error {status}: {message}")]
    ServerError { status: u16, message: String },

    #[error("Request failed with status {status}: {message}")]
    RequestFailed { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LedgerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn auth_error(msg: impl Into<String>) -> Self {
        Self::AuthError(msg.into())
    }

    /// Map a non-success HTTP status onto an error variant.
    pub fn from_http_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 => Self::AuthError(message),
            403 => Self::PermissionDenied(message),
            404 => Self::NotFound(message),
            429 => Self::RateLimited {
                retry_after_ms: None,
            },
            500..=599 => Self::ServerError { status, message },
            _ => Self::RequestFailed { status, message },
        }
    }

    /// HTTP status this error corresponds to, if any.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            LedgerError::AuthError(_) => Some(401),
            LedgerError::PermissionDenied(_) => Some(403),
            LedgerError::NotFound(_) => Some(404),
            LedgerError::RateLimited { .. } => Some(429),
            LedgerError::ServerError { status, .. } | LedgerError::RequestFailed { status, .. } => {
                Some(*status)
            }
            LedgerError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LedgerError::Network(_)
                | LedgerError::RateLimited { .. }
                | LedgerError::ServerError { .. }
                | LedgerError::InvalidResponse(_)
        )
    }

    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            LedgerError::RateLimited { retry_after_ms } => *retry_after_ms,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_http_status() {
        assert!(matches!(
            LedgerError::from_http_status(401, "x"),
            LedgerError::AuthError(_)
        ));
        assert!(matches!(
            LedgerError::from_http_status(403, "x"),
            LedgerError::PermissionDenied(_)
        ));
        assert!(matches!(
            LedgerError::from_http_status(429, "x"),
            LedgerError::RateLimited { .. }
        ));
        assert!(matches!(
            LedgerError::from_http_status(502, "x"),
            LedgerError::ServerError { status: 502, .. }
        ));
        assert!(matches!(
            LedgerError::from_http_status(400, "x"),
            LedgerError::RequestFailed { status: 400, .. }
        ));
    }

    #[test]
    fn test_retryable() {
        assert!(LedgerError::from_http_status(429, "").is_retryable());
        assert!(LedgerError::from_http_status(500, "").is_retryable());
        assert!(LedgerError::InvalidResponse("truncated".into()).is_retryable());
        assert!(!LedgerError::from_http_status(400, "").is_retryable());
        assert!(!LedgerError::from_http_status(403, "").is_retryable());
        assert!(!LedgerError::config_error("missing id").is_retryable());
    }

    #[test]
    fn test_http_status_round_trip() {
        for status in [401u16, 403, 404, 429, 418, 503] {
            assert_eq!(
                LedgerError::from_http_status(status, "").http_status(),
                Some(status)
            );
        }
    }
}
