//! Reel render jobs.
//!
//! This crate provides:
//! - Render requests binding uploaded files to a composition
//! - The render job: compile, run FFmpeg, verify output, clean up uploads
//! - Configuration from the environment and structured render logging

pub mod config;
pub mod error;
pub mod logging;
pub mod render_job;
pub mod request;

pub use config::RenderConfig;
pub use error::{WorkerError, WorkerResult};
pub use logging::RenderLogger;
pub use render_job::RenderJob;
pub use request::{DualRenderRequest, RenderRequest};
