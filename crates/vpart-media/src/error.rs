//! Error types for media operations.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while invoking FFmpeg/FFprobe.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid media file: {0}")]
    InvalidMedia(String),
}

impl MediaError {
    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create an invalid media error.
    pub fn invalid_media(message: impl Into<String>) -> Self {
        Self::InvalidMedia(message.into())
    }
}

/// Failure to read a duration from a media file.
#[derive(Debug, Error)]
#[error("Failed to probe {}: {source}", path.display())]
pub struct ProbeError {
    pub path: PathBuf,
    #[source]
    pub source: MediaError,
}

impl ProbeError {
    pub fn new(path: impl Into<PathBuf>, source: MediaError) -> Self {
        Self {
            path: path.into(),
            source,
        }
    }
}

/// The render sub-operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderStage {
    /// Producing the visual transform
    Transform,
    /// Finalizing the container and stripping metadata
    Finalize,
}

impl RenderStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderStage::Transform => "transform",
            RenderStage::Finalize => "finalize",
        }
    }
}

impl fmt::Display for RenderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure to render one segment, attributed to a stage.
#[derive(Debug, Error)]
#[error("Render {stage} stage failed for {label}: {source}")]
pub struct RenderError {
    pub stage: RenderStage,
    pub label: String,
    #[source]
    pub source: MediaError,
}

impl RenderError {
    pub fn transform(label: impl Into<String>, source: MediaError) -> Self {
        Self {
            stage: RenderStage::Transform,
            label: label.into(),
            source,
        }
    }

    pub fn finalize(label: impl Into<String>, source: MediaError) -> Self {
        Self {
            stage: RenderStage::Finalize,
            label: label.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_error_message_names_stage() {
        let err = RenderError::finalize("PART-2", MediaError::Timeout(30));
        assert_eq!(err.stage, RenderStage::Finalize);
        assert!(err.to_string().contains("finalize"));
        assert!(err.to_string().contains("PART-2"));
    }
}
