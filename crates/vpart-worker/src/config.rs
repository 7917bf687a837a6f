//! Pipeline configuration.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use vpart_models::env::{flag_or, optional, parse_optional, parse_or, string_or};
use vpart_models::{SegmentCountPolicy, TransformConfig};
use vpart_storage::RetryPolicy;

use crate::error::{PipelineError, PipelineResult};

/// Which ledger backend records segment outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerBackend {
    Sheets,
    File,
}

impl fmt::Display for LedgerBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerBackend::Sheets => f.write_str("sheets"),
            LedgerBackend::File => f.write_str("file"),
        }
    }
}

impl FromStr for LedgerBackend {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sheets" | "google_sheets" => Ok(LedgerBackend::Sheets),
            "file" | "jsonl" => Ok(LedgerBackend::File),
            other => Err(PipelineError::config_error(format!(
                "unknown ledger backend: {}",
                other
            ))),
        }
    }
}

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Local source media file
    pub input: PathBuf,
    /// Directory rendered artifacts are written to
    pub output_dir: PathBuf,
    pub segment_seconds: f64,
    pub count_policy: SegmentCountPolicy,
    /// Worker pool size
    pub concurrency: usize,
    /// Keep artifacts whose upload failed and reuse them on the next run
    pub retain_failed_uploads: bool,
    pub ledger: LedgerBackend,
    pub ledger_file: PathBuf,
    /// Remote collection (key prefix) segments are uploaded into
    pub collection: String,
    /// Per-FFmpeg-invocation timeout
    pub render_timeout_secs: Option<u64>,
    pub transform: TransformConfig,
    pub retry: RetryPolicy,
}

impl PipelineConfig {
    /// Config with defaults for everything but the input.
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output_dir: PathBuf::from("output_parts"),
            segment_seconds: 40.0,
            count_policy: SegmentCountPolicy::default(),
            concurrency: 4,
            retain_failed_uploads: false,
            ledger: LedgerBackend::File,
            ledger_file: PathBuf::from("ledger.jsonl"),
            collection: String::new(),
            render_timeout_secs: None,
            transform: TransformConfig::default(),
            retry: RetryPolicy::default(),
        }
    }

    /// Create config from environment variables.
    pub fn from_env() -> PipelineResult<Self> {
        let input = optional("VPART_INPUT")
            .ok_or_else(|| PipelineError::config_error("VPART_INPUT must be set"))?;
        let defaults = Self::new(input);

        let count_policy = match optional("VPART_SEGMENT_COUNT_POLICY") {
            Some(raw) => raw
                .parse()
                .map_err(|e| PipelineError::config_error(format!("{}", e)))?,
            None => defaults.count_policy,
        };

        let ledger = match optional("VPART_LEDGER") {
            Some(raw) => raw.parse()?,
            None => defaults.ledger,
        };

        let segment_seconds = parse_or("VPART_SEGMENT_SECONDS", defaults.segment_seconds);
        if !segment_seconds.is_finite() || segment_seconds <= 0.0 {
            return Err(PipelineError::config_error(format!(
                "VPART_SEGMENT_SECONDS must be positive, got {}",
                segment_seconds
            )));
        }

        Ok(Self {
            output_dir: PathBuf::from(string_or("VPART_OUTPUT_DIR", "output_parts")),
            segment_seconds,
            count_policy,
            concurrency: parse_or("VPART_CONCURRENCY", defaults.concurrency).max(1),
            retain_failed_uploads: flag_or(
                "VPART_RETAIN_FAILED_UPLOADS",
                defaults.retain_failed_uploads,
            ),
            ledger,
            ledger_file: PathBuf::from(string_or("VPART_LEDGER_FILE", "ledger.jsonl")),
            collection: string_or("VPART_COLLECTION", ""),
            render_timeout_secs: parse_optional("VPART_RENDER_TIMEOUT_SECS"),
            transform: TransformConfig::from_env(),
            retry: RetryPolicy::from_env(),
            ..defaults
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const KEYS: &[&str] = &[
        "VPART_INPUT",
        "VPART_OUTPUT_DIR",
        "VPART_SEGMENT_SECONDS",
        "VPART_SEGMENT_COUNT_POLICY",
        "VPART_CONCURRENCY",
        "VPART_RETAIN_FAILED_UPLOADS",
        "VPART_LEDGER",
        "VPART_LEDGER_FILE",
        "VPART_COLLECTION",
    ];

    fn clear() {
        for key in KEYS {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_requires_input() {
        clear();
        assert!(matches!(
            PipelineConfig::from_env(),
            Err(PipelineError::ConfigError(_))
        ));
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear();
        std::env::set_var("VPART_INPUT", "downloaded_video.mp4");

        let config = PipelineConfig::from_env().unwrap();
        assert_eq!(config.input, PathBuf::from("downloaded_video.mp4"));
        assert_eq!(config.output_dir, PathBuf::from("output_parts"));
        assert_eq!(config.segment_seconds, 40.0);
        assert_eq!(config.count_policy, SegmentCountPolicy::Ceil);
        assert_eq!(config.concurrency, 4);
        assert!(!config.retain_failed_uploads);
        assert_eq!(config.ledger, LedgerBackend::File);
        clear();
    }

    #[test]
    #[serial]
    fn test_overrides() {
        clear();
        std::env::set_var("VPART_INPUT", "in.mp4");
        std::env::set_var("VPART_SEGMENT_SECONDS", "30");
        std::env::set_var("VPART_SEGMENT_COUNT_POLICY", "floor_plus_one");
        std::env::set_var("VPART_CONCURRENCY", "0");
        std::env::set_var("VPART_RETAIN_FAILED_UPLOADS", "1");
        std::env::set_var("VPART_LEDGER", "sheets");

        let config = PipelineConfig::from_env().unwrap();
        assert_eq!(config.segment_seconds, 30.0);
        assert_eq!(config.count_policy, SegmentCountPolicy::FloorPlusOne);
        assert_eq!(config.concurrency, 1);
        assert!(config.retain_failed_uploads);
        assert_eq!(config.ledger, LedgerBackend::Sheets);
        clear();
    }

    #[test]
    #[serial]
    fn test_rejects_bad_values() {
        clear();
        std::env::set_var("VPART_INPUT", "in.mp4");
        std::env::set_var("VPART_LEDGER", "postgres");
        assert!(PipelineConfig::from_env().is_err());

        std::env::remove_var("VPART_LEDGER");
        std::env::set_var("VPART_SEGMENT_SECONDS", "-5");
        assert!(PipelineConfig::from_env().is_err());
        clear();
    }
}
