//! Retry policy and the retrying upload.

use std::path::Path;
use std::str::FromStr;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use vpart_models::{env, RemoteDestination, RemoteObject};

use crate::error::UploadError;
use crate::uploader::Uploader;

/// Delay strategy between upload attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay before every retry
    Fixed(Duration),
    /// `base * 2^(retry - 1)`, capped at `max`
    Exponential { base: Duration, max: Duration },
}

impl FromStr for Backoff {
    type Err = String;

    /// Parses the strategy name only; delays come from [`RetryPolicy::from_env`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" => Ok(Backoff::Fixed(Duration::from_millis(DEFAULT_BASE_DELAY_MS))),
            "exponential" | "exp" => Ok(Backoff::Exponential {
                base: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
                max: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
            }),
            other => Err(format!("unknown backoff strategy: {}", other)),
        }
    }
}

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_BASE_DELAY_MS: u64 = 2_000;
const DEFAULT_MAX_DELAY_MS: u64 = 60_000;

/// How many times to try an upload and how long to wait in between.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first; at least 1
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: Backoff::Exponential {
                base: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
                max: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
            },
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Policy that never waits between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Backoff::Fixed(Duration::ZERO))
    }

    pub fn from_env() -> Self {
        let max_attempts = env::parse_or("VPART_UPLOAD_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS);
        let base = Duration::from_millis(env::parse_or(
            "VPART_UPLOAD_BASE_DELAY_MS",
            DEFAULT_BASE_DELAY_MS,
        ));
        let max = Duration::from_millis(env::parse_or(
            "VPART_UPLOAD_MAX_DELAY_MS",
            DEFAULT_MAX_DELAY_MS,
        ));

        let backoff = match env::string_or("VPART_UPLOAD_BACKOFF", "exponential").parse() {
            Ok(Backoff::Fixed(_)) => Backoff::Fixed(base),
            Ok(Backoff::Exponential { .. }) => Backoff::Exponential { base, max },
            Err(e) => {
                warn!("{}, using exponential backoff", e);
                Backoff::Exponential { base, max }
            }
        };

        Self::new(max_attempts, backoff)
    }

    /// Delay before retry number `retry` (1 = the wait after the first failure).
    pub fn delay_for_attempt(&self, retry: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed(delay) => delay,
            Backoff::Exponential { base, max } => {
                let exponent = retry.saturating_sub(1).min(31);
                base.saturating_mul(2u32.pow(exponent)).min(max)
            }
        }
    }
}

/// A successful upload and how many attempts it took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub remote: RemoteObject,
    pub attempts: u32,
}

/// Upload `path`, retrying transient failures according to `policy`.
///
/// Permanent failures end the loop immediately.
pub async fn upload_with_retry(
    uploader: &dyn Uploader,
    policy: &RetryPolicy,
    path: &Path,
    destination: &RemoteDestination,
) -> Result<UploadOutcome, UploadError> {
    let max_attempts = policy.max_attempts.max(1);
    let started = Instant::now();
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        metrics::counter!("vpart_upload_attempts_total").increment(1);

        match uploader.upload(path, destination).await {
            Ok(remote) => {
                metrics::histogram!("vpart_upload_duration_seconds")
                    .record(started.elapsed().as_secs_f64());
                debug!(attempt, id = %remote.id, "Upload succeeded");
                return Ok(UploadOutcome {
                    remote,
                    attempts: attempt,
                });
            }
            Err(e) if e.is_transient() && attempt < max_attempts => {
                let delay = policy.delay_for_attempt(attempt);
                metrics::counter!("vpart_upload_retries_total").increment(1);
                warn!(
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Upload attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(source) => {
                return Err(UploadError {
                    attempts: attempt,
                    source,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use crate::uploader::MockUploader;
    use serial_test::serial;
    use std::path::PathBuf;

    fn destination() -> RemoteDestination {
        RemoteDestination::new("shows", "part_001.mp4", "video/mp4")
    }

    fn remote() -> RemoteObject {
        RemoteObject {
            id: "shows/part_001.mp4".to_string(),
            public_url: None,
        }
    }

    #[test]
    fn test_exponential_delay() {
        let policy = RetryPolicy::new(
            5,
            Backoff::Exponential {
                base: Duration::from_millis(100),
                max: Duration::from_millis(500),
            },
        );
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(400));
        assert_eq!(policy.delay_for_attempt(4), Duration::from_millis(500));
        assert_eq!(policy.delay_for_attempt(40), Duration::from_millis(500));
    }

    #[test]
    fn test_fixed_delay() {
        let policy = RetryPolicy::new(3, Backoff::Fixed(Duration::from_secs(5)));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(5));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_secs(5));
    }

    #[test]
    fn test_max_attempts_floor() {
        assert_eq!(RetryPolicy::immediate(0).max_attempts, 1);
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let mut uploader = MockUploader::new();
        let mut calls = 0u32;
        uploader.expect_upload().times(3).returning(move |_, _| {
            calls += 1;
            if calls < 3 {
                Err(StorageError::transient("connection reset"))
            } else {
                Ok(remote())
            }
        });

        let outcome = upload_with_retry(
            &uploader,
            &RetryPolicy::immediate(5),
            &PathBuf::from("part_001.mp4"),
            &destination(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.attempts, 3);
        assert_eq!(outcome.remote, remote());
    }

    #[tokio::test]
    async fn test_exhausts_attempts() {
        let mut uploader = MockUploader::new();
        uploader
            .expect_upload()
            .times(4)
            .returning(|_, _| Err(StorageError::from_http_status(503, "unavailable")));

        let err = upload_with_retry(
            &uploader,
            &RetryPolicy::immediate(4),
            &PathBuf::from("part_001.mp4"),
            &destination(),
        )
        .await
        .unwrap_err();

        assert_eq!(err.attempts, 4);
        assert!(err.source.is_transient());
    }

    #[tokio::test]
    async fn test_permanent_failure_stops_immediately() {
        let mut uploader = MockUploader::new();
        uploader
            .expect_upload()
            .times(1)
            .returning(|_, _| Err(StorageError::from_http_status(403, "forbidden")));

        let err = upload_with_retry(
            &uploader,
            &RetryPolicy::immediate(5),
            &PathBuf::from("part_001.mp4"),
            &destination(),
        )
        .await
        .unwrap_err();

        assert_eq!(err.attempts, 1);
    }

    #[test]
    #[serial]
    fn test_policy_from_env() {
        std::env::set_var("VPART_UPLOAD_MAX_ATTEMPTS", "5");
        std::env::set_var("VPART_UPLOAD_BACKOFF", "fixed");
        std::env::set_var("VPART_UPLOAD_BASE_DELAY_MS", "250");

        let policy = RetryPolicy::from_env();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.backoff, Backoff::Fixed(Duration::from_millis(250)));

        std::env::remove_var("VPART_UPLOAD_MAX_ATTEMPTS");
        std::env::remove_var("VPART_UPLOAD_BACKOFF");
        std::env::remove_var("VPART_UPLOAD_BASE_DELAY_MS");

        assert_eq!(RetryPolicy::from_env(), RetryPolicy::default());
    }
}
