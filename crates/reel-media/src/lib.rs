//! Composition compiler and FFmpeg orchestration.
//!
//! This crate provides:
//! - Stream labels, the clip timeline and preview-matching geometry
//! - Filter-graph programs and their static checks
//! - Transition, decoration and audio builders
//! - The composition compiler (single-track and two-source)
//! - FFmpeg command building, process running and progress parsing
//! - Per-request temp file cleanup and ffprobe inspection

pub mod audio;
pub mod cleanup;
pub mod command;
pub mod compiler;
pub mod decorations;
pub mod error;
pub mod escape;
pub mod fonts;
pub mod geometry;
pub mod graph;
pub mod labels;
pub mod probe;
pub mod progress;
pub mod timeline;
pub mod transitions;

pub use cleanup::{CleanupReport, FileRemover, FsRemover, TempFileSet};
pub use command::{check_ffmpeg, check_ffprobe, EngineRequest, EngineRunner, FfmpegCommand, FfmpegRunner};
pub use compiler::{CompositionCompiler, SourceInfo};
pub use error::{MediaError, MediaResult};
pub use fonts::{FontPlatform, FontResolver, FontconfigOnly, StaticFontTable};
pub use graph::{CompiledProgram, Filter, FilterStage, InputFile};
pub use labels::{LabelAllocator, StreamKind, StreamLabel};
pub use probe::{probe_media, MediaInfo};
pub use progress::{ProgressCallback, ProgressTracker};
pub use timeline::{ClipTimeline, ClipWindow};
