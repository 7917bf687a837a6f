//! Per-run visual transform configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::encoding::EncodingConfig;
use crate::env::{optional, parse_or, string_or};

/// Static overlay and canvas settings applied to every segment of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformConfig {
    pub canvas_width: u32,
    pub canvas_height: u32,
    /// Caption drawn near the top of every segment
    pub top_text: String,
    /// Prefix of the per-segment bottom caption and ledger label
    pub label_prefix: String,
    pub font_file: String,
    pub font_size: u32,
    pub text_color: String,
    /// Color used to pad the scaled source up to the canvas
    pub pad_color: String,
    pub top_margin: u32,
    pub bottom_margin: u32,
    /// Optional watermark/logo asset (image or video)
    pub logo_file: Option<PathBuf>,
    pub frame_rate: u32,
    pub encoding: EncodingConfig,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            canvas_width: 1080,
            canvas_height: 1920,
            top_text: String::new(),
            label_prefix: "PART-".to_string(),
            font_file: "arial.ttf".to_string(),
            font_size: 64,
            text_color: "black".to_string(),
            pad_color: "white".to_string(),
            top_margin: 100,
            bottom_margin: 150,
            logo_file: None,
            frame_rate: 30,
            encoding: EncodingConfig::default(),
        }
    }
}

impl TransformConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let mut encoding = EncodingConfig::default();
        if let Some(bitrate) = optional("VPART_VIDEO_BITRATE") {
            encoding = encoding.with_video_bitrate(bitrate);
        }

        Self {
            canvas_width: parse_or("VPART_CANVAS_WIDTH", defaults.canvas_width),
            canvas_height: parse_or("VPART_CANVAS_HEIGHT", defaults.canvas_height),
            top_text: string_or("VPART_TOP_TEXT", &defaults.top_text),
            label_prefix: string_or("VPART_LABEL_PREFIX", &defaults.label_prefix),
            font_file: string_or("VPART_FONT_FILE", &defaults.font_file),
            font_size: parse_or("VPART_FONT_SIZE", defaults.font_size),
            text_color: string_or("VPART_TEXT_COLOR", &defaults.text_color),
            pad_color: string_or("VPART_PAD_COLOR", &defaults.pad_color),
            top_margin: parse_or("VPART_TOP_MARGIN", defaults.top_margin),
            bottom_margin: parse_or("VPART_BOTTOM_MARGIN", defaults.bottom_margin),
            logo_file: optional("VPART_LOGO_FILE").map(PathBuf::from),
            frame_rate: parse_or("VPART_FRAME_RATE", defaults.frame_rate),
            encoding,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        for key in ["VPART_CANVAS_WIDTH", "VPART_LABEL_PREFIX", "VPART_LOGO_FILE", "VPART_VIDEO_BITRATE"] {
            std::env::remove_var(key);
        }
        let config = TransformConfig::from_env();
        assert_eq!(config.canvas_width, 1080);
        assert_eq!(config.label_prefix, "PART-");
        assert!(config.logo_file.is_none());
        assert!(config.encoding.video_bitrate.is_none());
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        std::env::set_var("VPART_CANVAS_WIDTH", "720");
        std::env::set_var("VPART_VIDEO_BITRATE", "3M");
        std::env::set_var("VPART_LOGO_FILE", "  ");
        let config = TransformConfig::from_env();
        assert_eq!(config.canvas_width, 720);
        assert_eq!(config.encoding.video_bitrate.as_deref(), Some("3M"));
        assert!(config.logo_file.is_none());
        std::env::remove_var("VPART_CANVAS_WIDTH");
        std::env::remove_var("VPART_VIDEO_BITRATE");
        std::env::remove_var("VPART_LOGO_FILE");
    }
}
