//! Segment rendering: transform, then finalize.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use vpart_models::{SegmentDescriptor, SourceMedia, TransformConfig};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, RenderError};
use crate::fs_utils::{ensure_dir, remove_if_exists};
use crate::probe::Prober;
use crate::render_spec::RenderSpec;

/// A finished, finalized segment on local disk.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedArtifact {
    pub label: String,
    pub path: PathBuf,
    /// Duration re-probed from the finalized file
    pub duration_seconds: f64,
}

/// Produces the final artifact for one segment.
///
/// Implementations must be safe to call concurrently for distinct segments.
/// Intermediate files are removed whether or not the render succeeds.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(
        &self,
        media: &SourceMedia,
        segment: &SegmentDescriptor,
    ) -> Result<RenderedArtifact, RenderError>;
}

/// [`Renderer`] that shells out to FFmpeg.
pub struct FfmpegRenderer {
    config: TransformConfig,
    output_dir: PathBuf,
    prober: Arc<dyn Prober>,
    runner: FfmpegRunner,
    reuse_existing: bool,
}

impl FfmpegRenderer {
    pub fn new(
        config: TransformConfig,
        output_dir: impl Into<PathBuf>,
        prober: Arc<dyn Prober>,
    ) -> Self {
        Self {
            config,
            output_dir: output_dir.into(),
            prober,
            runner: FfmpegRunner::new(),
            reuse_existing: false,
        }
    }

    /// Kill FFmpeg runs that exceed `secs`.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.runner = FfmpegRunner::new().with_timeout(secs);
        self
    }

    /// Reuse a final artifact already on disk when it probes cleanly.
    pub fn with_reuse_existing(mut self, reuse: bool) -> Self {
        self.reuse_existing = reuse;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn transform_command(
        &self,
        media: &SourceMedia,
        segment: &SegmentDescriptor,
        intermediate: &Path,
    ) -> FfmpegCommand {
        let spec = RenderSpec::for_segment(&self.config, &segment.label).without_missing_assets();
        let length = segment.expected_length(media.duration_seconds());

        FfmpegCommand::new(media.path(), intermediate)
            .seek(segment.start_offset)
            .duration(length)
            .video_filter(spec.to_filter_graph())
            .frame_rate(self.config.frame_rate)
            .output_args(self.config.encoding.to_ffmpeg_args())
    }

    fn finalize_command(intermediate: &Path, output: &Path) -> FfmpegCommand {
        FfmpegCommand::new(intermediate, output)
            .codec_copy()
            .strip_metadata()
            .faststart()
    }

    async fn try_reuse(&self, segment: &SegmentDescriptor, output: &Path) -> Option<RenderedArtifact> {
        if !self.reuse_existing || !output.exists() {
            return None;
        }
        match self.prober.probe(output).await {
            Ok(duration) if duration > 0.0 => {
                info!(label = %segment.label, path = %output.display(), "Reusing existing artifact");
                Some(RenderedArtifact {
                    label: segment.label.clone(),
                    path: output.to_path_buf(),
                    duration_seconds: duration,
                })
            }
            Ok(_) | Err(_) => {
                warn!(label = %segment.label, "Existing artifact is unreadable, re-rendering");
                None
            }
        }
    }
}

#[async_trait]
impl Renderer for FfmpegRenderer {
    async fn render(
        &self,
        media: &SourceMedia,
        segment: &SegmentDescriptor,
    ) -> Result<RenderedArtifact, RenderError> {
        let label = segment.label.as_str();
        let output = self.output_dir.join(segment.output_filename());
        let intermediate = self.output_dir.join(segment.intermediate_filename());

        if let Some(artifact) = self.try_reuse(segment, &output).await {
            return Ok(artifact);
        }

        ensure_dir(&self.output_dir)
            .await
            .map_err(|e| RenderError::transform(label, e))?;

        let started = Instant::now();

        let transform = self.transform_command(media, segment, &intermediate);
        debug!(label, args = ?transform.build_args(), "Running transform stage");
        if let Err(e) = self.runner.run(&transform).await {
            remove_if_exists(&intermediate).await;
            return Err(RenderError::transform(label, e));
        }

        let finalize = Self::finalize_command(&intermediate, &output);
        debug!(label, "Running finalize stage");
        let finalized = self.runner.run(&finalize).await;
        remove_if_exists(&intermediate).await;
        if let Err(e) = finalized {
            remove_if_exists(&output).await;
            return Err(RenderError::finalize(label, e));
        }

        let duration_seconds = match self.prober.probe(&output).await {
            Ok(d) if d > 0.0 => d,
            Ok(d) => {
                remove_if_exists(&output).await;
                return Err(RenderError::finalize(
                    label,
                    MediaError::invalid_media(format!("Finalized artifact has duration {d}")),
                ));
            }
            Err(e) => {
                remove_if_exists(&output).await;
                return Err(RenderError::finalize(label, e.source));
            }
        };

        let elapsed = started.elapsed().as_secs_f64();
        metrics::histogram!("vpart_render_duration_seconds").record(elapsed);
        debug!(label, elapsed_secs = elapsed, duration_seconds, "Segment rendered");

        Ok(RenderedArtifact {
            label: label.to_string(),
            path: output,
            duration_seconds,
        })
    }
}
