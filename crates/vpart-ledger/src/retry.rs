//! Retry with exponential backoff for ledger requests.

use std::time::Duration;

use tracing::{info_span, warn, Instrument};

use vpart_models::env;

use crate::error::LedgerResult;
use crate::metrics::record_retry;

/// Retry policy for ledger HTTP calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 500,
            max_delay_ms: 10_000,
        }
    }
}

impl RetryConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_retries: env::parse_or("SHEETS_MAX_RETRIES", defaults.max_retries),
            base_delay_ms: env::parse_or("SHEETS_RETRY_BASE_MS", defaults.base_delay_ms),
            max_delay_ms: env::parse_or("SHEETS_RETRY_MAX_MS", defaults.max_delay_ms),
        }
    }

    /// No retries; used where the caller handles failure itself.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }
}

/// Run `op`, retrying retryable errors.
///
/// Honors a server-provided retry-after delay on 429.
pub async fn with_retry<T, F, Fut>(config: &RetryConfig, operation: &str, op: F) -> LedgerResult<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = LedgerResult<T>>,
{
    let mut attempt = 0u32;
    loop {
        let span = info_span!("ledger_retry", operation = %operation, attempt = attempt + 1);

        match op().instrument(span).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < config.max_retries => {
                let delay = calculate_delay(config, attempt, e.retry_after_ms());
                warn!(
                    operation = %operation,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    "Ledger request failed, retrying: {}",
                    e
                );
                record_retry(operation);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// `base * 2^attempt`, capped, or the server's retry-after when given.
fn calculate_delay(config: &RetryConfig, attempt: u32, retry_after_ms: Option<u64>) -> Duration {
    if let Some(after) = retry_after_ms {
        return Duration::from_millis(after.min(config.max_delay_ms));
    }
    let exp = config
        .base_delay_ms
        .saturating_mul(2u64.saturating_pow(attempt));
    Duration::from_millis(exp.min(config.max_delay_ms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_calculate_delay() {
        let config = RetryConfig {
            max_retries: 5,
            base_delay_ms: 100,
            max_delay_ms: 1000,
        };
        assert_eq!(calculate_delay(&config, 0, None), Duration::from_millis(100));
        assert_eq!(calculate_delay(&config, 2, None), Duration::from_millis(400));
        assert_eq!(calculate_delay(&config, 10, None), Duration::from_millis(1000));
        assert_eq!(calculate_delay(&config, 0, Some(250)), Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_retries_server_errors() {
        let config = RetryConfig {
            max_retries: 3,
            base_delay_ms: 1,
            max_delay_ms: 1,
        };
        let calls = AtomicU32::new(0);

        let result = with_retry(&config, "append", || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(LedgerError::from_http_status(503, "busy"))
            } else {
                Ok(7)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_does_not_retry_client_errors() {
        let config = RetryConfig::default();
        let calls = AtomicU32::new(0);

        let result: LedgerResult<()> = with_retry(&config, "append", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(LedgerError::from_http_status(400, "bad range"))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
