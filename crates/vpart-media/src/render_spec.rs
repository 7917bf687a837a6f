//! Structured description of the per-segment visual transform.
//!
//! A [`RenderSpec`] is an ordered list of typed stages. Backends compile it into
//! whatever their tool needs; [`RenderSpec::to_filter_graph`] produces an FFmpeg
//! `-vf` graph.

use std::path::{Path, PathBuf};

use vpart_models::{guess_mime_type, TransformConfig};

/// Edge length video logos are scaled to before overlaying.
const VIDEO_LOGO_SIZE: u32 = 200;
/// Distance of the logo from the right and top edges.
const LOGO_MARGIN: u32 = 50;

/// Vertical placement of a text caption, horizontally centered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAnchor {
    /// Top edge of the text `margin` pixels below the canvas top
    Top { margin: u32 },
    /// Bottom edge of the text `margin` pixels above the canvas bottom
    Bottom { margin: u32 },
}

/// Whether an overlay asset is a still image or a video.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayKind {
    Image,
    Video,
}

impl OverlayKind {
    /// Classify an asset by its MIME type.
    pub fn detect(path: &Path) -> Self {
        match guess_mime_type(path) {
            Some(mime) if mime.starts_with("video/") => OverlayKind::Video,
            _ => OverlayKind::Image,
        }
    }
}

/// One named transform stage with typed parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum TransformStage {
    /// Scale down to fit inside the canvas, keeping the aspect ratio
    ScaleToFit { width: u32, height: u32 },
    /// Pad to the canvas size, centering the picture
    Pad { width: u32, height: u32, color: String },
    DrawText {
        text: String,
        font_file: String,
        font_size: u32,
        color: String,
        anchor: TextAnchor,
    },
    /// Overlay an asset in the top-right corner
    Overlay {
        asset: PathBuf,
        kind: OverlayKind,
        right_margin: u32,
        top_margin: u32,
        size: Option<(u32, u32)>,
    },
}

impl TransformStage {
    pub fn name(&self) -> &'static str {
        match self {
            TransformStage::ScaleToFit { .. } => "scale",
            TransformStage::Pad { .. } => "pad",
            TransformStage::DrawText { .. } => "drawtext",
            TransformStage::Overlay { .. } => "overlay",
        }
    }

    /// Single-chain filter for non-overlay stages.
    fn to_filter(&self) -> Option<String> {
        match self {
            TransformStage::ScaleToFit { width, height } => Some(format!(
                "scale={}:{}:force_original_aspect_ratio=decrease",
                width, height
            )),
            TransformStage::Pad { width, height, color } => Some(format!(
                "pad={}:{}:(ow-iw)/2:(oh-ih)/2:color={}",
                width, height, color
            )),
            TransformStage::DrawText {
                text,
                font_file,
                font_size,
                color,
                anchor,
            } => {
                let y = match anchor {
                    TextAnchor::Top { margin } => margin.to_string(),
                    TextAnchor::Bottom { margin } => format!("h-{}-th", margin),
                };
                Some(format!(
                    "drawtext=fontfile='{}':text='{}':fontsize={}:fontcolor={}:x=(w-text_w)/2:y={}",
                    escape_filter_value(font_file),
                    escape_drawtext(text),
                    font_size,
                    color,
                    y
                ))
            }
            TransformStage::Overlay { .. } => None,
        }
    }
}

/// Ordered transform stages for one segment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderSpec {
    stages: Vec<TransformStage>,
}

impl RenderSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage.
    pub fn stage(mut self, stage: TransformStage) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn stages(&self) -> &[TransformStage] {
        &self.stages
    }

    /// Build the standard spec: fit to canvas, pad, top caption, segment label, logo.
    pub fn for_segment(config: &TransformConfig, label: &str) -> Self {
        let mut spec = Self::new()
            .stage(TransformStage::ScaleToFit {
                width: config.canvas_width,
                height: config.canvas_height,
            })
            .stage(TransformStage::Pad {
                width: config.canvas_width,
                height: config.canvas_height,
                color: config.pad_color.clone(),
            });

        if !config.top_text.is_empty() {
            spec = spec.stage(TransformStage::DrawText {
                text: config.top_text.clone(),
                font_file: config.font_file.clone(),
                font_size: config.font_size,
                color: config.text_color.clone(),
                anchor: TextAnchor::Top {
                    margin: config.top_margin,
                },
            });
        }

        spec = spec.stage(TransformStage::DrawText {
            text: label.to_string(),
            font_file: config.font_file.clone(),
            font_size: config.font_size,
            color: config.text_color.clone(),
            anchor: TextAnchor::Bottom {
                margin: config.bottom_margin,
            },
        });

        if let Some(logo) = &config.logo_file {
            let kind = OverlayKind::detect(logo);
            let size = match kind {
                OverlayKind::Video => Some((VIDEO_LOGO_SIZE, VIDEO_LOGO_SIZE)),
                OverlayKind::Image => None,
            };
            spec = spec.stage(TransformStage::Overlay {
                asset: logo.clone(),
                kind,
                right_margin: LOGO_MARGIN,
                top_margin: LOGO_MARGIN,
                size,
            });
        }

        spec
    }

    /// Drop overlay stages whose asset is missing on disk.
    pub fn without_missing_assets(self) -> Self {
        Self {
            stages: self
                .stages
                .into_iter()
                .filter(|stage| match stage {
                    TransformStage::Overlay { asset, .. } => asset.exists(),
                    _ => true,
                })
                .collect(),
        }
    }

    /// Compile to a single-input FFmpeg filter graph, in stage order.
    ///
    /// Overlays use the `movie` source filter so the command keeps one input.
    /// Filters listed after an overlay apply to the overlaid picture.
    pub fn to_filter_graph(&self) -> String {
        let mut graph: Vec<String> = Vec::new();
        let mut pending: Vec<String> = Vec::new();
        let mut current = "in".to_string();
        let mut overlays = 0usize;

        for stage in &self.stages {
            let TransformStage::Overlay {
                asset,
                kind,
                right_margin,
                top_margin,
                size,
            } = stage
            else {
                pending.extend(stage.to_filter());
                continue;
            };

            let base = flush_chain(&mut graph, &mut pending, &current, overlays);

            let mut source = format!("movie='{}'", escape_filter_value(&asset.to_string_lossy()));
            if *kind == OverlayKind::Video {
                source.push_str(":loop=0,setpts=N/FRAME_RATE/TB");
            }
            if let Some((w, h)) = size {
                source.push_str(&format!(",scale={}:{}", w, h));
            }
            graph.push(format!("{}[wm{}]", source, overlays));
            graph.push(format!(
                "[{}][wm{}]overlay=W-w-{}:{}",
                base, overlays, right_margin, top_margin
            ));

            current = format!("ov{}", overlays);
            overlays += 1;
        }

        if overlays == 0 {
            return if pending.is_empty() {
                "null".to_string()
            } else {
                pending.join(",")
            };
        }

        if !pending.is_empty() {
            if let Some(last) = graph.last_mut() {
                last.push_str(&format!("[{}]", current));
            }
            graph.push(format!("[{}]{}", current, pending.join(",")));
        }

        graph.join(";")
    }
}

/// Emit the filters gathered since the last overlay and return the label
/// the next overlay reads from.
fn flush_chain(
    graph: &mut Vec<String>,
    pending: &mut Vec<String>,
    current: &str,
    overlays: usize,
) -> String {
    if overlays > 0 {
        if let Some(last) = graph.last_mut() {
            last.push_str(&format!("[{}]", current));
        }
    }
    if pending.is_empty() {
        return current.to_string();
    }

    let base = format!("base{}", overlays);
    graph.push(format!("[{}]{}[{}]", current, pending.join(","), base));
    pending.clear();
    base
}

/// Escape a value placed inside single quotes in a filter argument.
fn escape_filter_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace(':', "\\:")
}

/// Escape drawtext text, which additionally expands `%{...}` sequences.
fn escape_drawtext(text: &str) -> String {
    escape_filter_value(text).replace('%', "\\%")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TransformConfig {
        TransformConfig {
            top_text: "Superhit Don no.1".to_string(),
            ..TransformConfig::default()
        }
    }

    #[test]
    fn test_stage_order() {
        let spec = RenderSpec::for_segment(&config(), "PART-3");
        let names: Vec<&str> = spec.stages().iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["scale", "pad", "drawtext", "drawtext"]);
    }

    #[test]
    fn test_filter_graph_without_logo() {
        let graph = RenderSpec::for_segment(&config(), "PART-3").to_filter_graph();
        assert!(graph.starts_with("scale=1080:1920:force_original_aspect_ratio=decrease,"));
        assert!(graph.contains("pad=1080:1920:(ow-iw)/2:(oh-ih)/2:color=white"));
        assert!(graph.contains("text='PART-3'"));
        assert!(graph.contains("y=h-150-th"));
        assert!(graph.contains("y=100"));
        assert!(!graph.contains("movie="));
    }

    #[test]
    fn test_empty_top_text_is_skipped() {
        let spec = RenderSpec::for_segment(&TransformConfig::default(), "PART-1");
        assert_eq!(spec.stages().len(), 3);
    }

    #[test]
    fn test_image_logo_overlay() {
        let config = TransformConfig {
            logo_file: Some(PathBuf::from("logo.png")),
            ..config()
        };
        let graph = RenderSpec::for_segment(&config, "PART-1").to_filter_graph();
        assert!(graph.starts_with("[in]scale="));
        assert!(graph.contains("movie='logo.png'[wm0]"));
        assert!(graph.ends_with("[base0][wm0]overlay=W-w-50:50"));
        assert!(!graph.contains("scale=200:200"));
    }

    #[test]
    fn test_video_logo_is_scaled_and_looped() {
        let config = TransformConfig {
            logo_file: Some(PathBuf::from("intro.mp4")),
            ..config()
        };
        let graph = RenderSpec::for_segment(&config, "PART-1").to_filter_graph();
        assert!(graph.contains("movie='intro.mp4':loop=0,setpts=N/FRAME_RATE/TB,scale=200:200[wm0]"));
    }

    #[test]
    fn test_missing_assets_are_dropped() {
        let config = TransformConfig {
            logo_file: Some(PathBuf::from("/nonexistent/logo.png")),
            ..config()
        };
        let spec = RenderSpec::for_segment(&config, "PART-1").without_missing_assets();
        assert!(spec.stages().iter().all(|s| s.name() != "overlay"));
    }

    #[test]
    fn test_text_escaping() {
        assert_eq!(escape_drawtext("It's 5:00 100%"), "It\\'s 5\\:00 100\\%");
        assert_eq!(escape_filter_value("C:\\fonts\\a.ttf"), "C\\:\\\\fonts\\\\a.ttf");
    }

    fn logo() -> TransformStage {
        TransformStage::Overlay {
            asset: PathBuf::from("logo.png"),
            kind: OverlayKind::Image,
            right_margin: 50,
            top_margin: 50,
            size: None,
        }
    }

    #[test]
    fn test_stages_after_overlay_apply_to_overlaid_picture() {
        let graph = RenderSpec::new()
            .stage(TransformStage::ScaleToFit { width: 1080, height: 1920 })
            .stage(logo())
            .stage(TransformStage::Pad {
                width: 1080,
                height: 1920,
                color: "white".to_string(),
            })
            .to_filter_graph();

        assert_eq!(
            graph,
            "[in]scale=1080:1920:force_original_aspect_ratio=decrease[base0];\
             movie='logo.png'[wm0];\
             [base0][wm0]overlay=W-w-50:50[ov0];\
             [ov0]pad=1080:1920:(ow-iw)/2:(oh-ih)/2:color=white"
        );
    }

    #[test]
    fn test_consecutive_overlays_chain() {
        let graph = RenderSpec::new().stage(logo()).stage(logo()).to_filter_graph();
        assert_eq!(
            graph,
            "movie='logo.png'[wm0];\
             [in][wm0]overlay=W-w-50:50[ov0];\
             movie='logo.png'[wm1];\
             [ov0][wm1]overlay=W-w-50:50"
        );
    }

    #[test]
    fn test_empty_spec_is_passthrough() {
        assert_eq!(RenderSpec::new().to_filter_graph(), "null");
    }
}
