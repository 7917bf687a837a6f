//! FFmpeg CLI wrapper for segment probing and rendering.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building and a runner with timeout support
//! - Duration probing via FFprobe behind the [`Prober`] trait
//! - [`RenderSpec`]: ordered, typed transform stages compiled to a filter graph
//! - [`Renderer`]: transform + finalize of one segment into a local artifact

pub mod command;
pub mod error;
pub mod fs_utils;
pub mod probe;
pub mod render_spec;
pub mod renderer;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult, ProbeError, RenderError, RenderStage};
pub use probe::{FfprobeProber, Prober};
pub use render_spec::{OverlayKind, RenderSpec, TextAnchor, TransformStage};
pub use renderer::{FfmpegRenderer, RenderedArtifact, Renderer};
