//! Render job processing.
//!
//! One request runs compile, execute and cleanup. The request's uploads are
//! handed over as a [`TempFileSet`] and receive exactly one removal attempt
//! whichever way the render ends.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn, Instrument};

use reel_media::{
    probe_media, CompiledProgram, CompositionCompiler, EngineRunner, FfmpegCommand,
    MediaError, ProgressCallback, SourceInfo, StaticFontTable, TempFileSet,
};
use reel_models::timestamp::format_seconds;
use reel_models::{DualSourceSpec, RenderId, RenderOutput};

use crate::config::RenderConfig;
use crate::error::WorkerResult;
use crate::logging::RenderLogger;
use crate::request::{DualRenderRequest, RenderRequest};

/// Compiles and renders compositions.
#[derive(Clone)]
pub struct RenderJob {
    config: RenderConfig,
    engine: Arc<dyn EngineRunner>,
    compiler: CompositionCompiler,
}

impl RenderJob {
    /// Fonts are resolved from the table of the configured platform.
    pub fn new(config: RenderConfig, engine: Arc<dyn EngineRunner>) -> Self {
        let fonts = Arc::new(StaticFontTable::for_platform(config.font_platform));
        Self {
            config,
            engine,
            compiler: CompositionCompiler::new(fonts),
        }
    }

    /// Compile a request without running the engine.
    pub fn compile_only(&self, request: &RenderRequest) -> WorkerResult<CompiledProgram> {
        let spec = request.bound_composition()?;
        Ok(self.compiler.compile(&spec)?)
    }

    /// Compile a two-source request, probing sources whose length is unknown.
    pub async fn compile_dual_only(&self, request: &DualRenderRequest) -> WorkerResult<CompiledProgram> {
        let spec = request.bound_spec();
        self.compile_dual_spec(&spec).await
    }

    /// Render a single-track composition.
    pub async fn render(
        &self,
        request: RenderRequest,
        uploads: TempFileSet,
        on_progress: ProgressCallback,
    ) -> WorkerResult<RenderOutput> {
        let render_id = RenderId::new();
        let logger = RenderLogger::new(&render_id, "render");

        let result = self
            .render_single(&request, &render_id, &logger, on_progress)
            .instrument(logger.create_span())
            .await;

        finish(result, uploads, &logger).await
    }

    /// Render two sources stacked vertically.
    pub async fn render_dual(
        &self,
        request: DualRenderRequest,
        uploads: TempFileSet,
        on_progress: ProgressCallback,
    ) -> WorkerResult<RenderOutput> {
        let render_id = RenderId::new();
        let logger = RenderLogger::new(&render_id, "render_dual");

        let result = self
            .render_stacked(&request, &render_id, &logger, on_progress)
            .instrument(logger.create_span())
            .await;

        finish(result, uploads, &logger).await
    }

    async fn render_single(
        &self,
        request: &RenderRequest,
        render_id: &RenderId,
        logger: &RenderLogger,
        on_progress: ProgressCallback,
    ) -> WorkerResult<RenderOutput> {
        logger.log_start(&format!("{} clips", request.composition.clips.len()));
        let spec = request.bound_composition()?;
        ensure_inputs_exist(&spec.input_paths())?;
        let program = self.compiler.compile(&spec)?;
        self.execute(&program, render_id, logger, on_progress).await
    }

    async fn render_stacked(
        &self,
        request: &DualRenderRequest,
        render_id: &RenderId,
        logger: &RenderLogger,
        on_progress: ProgressCallback,
    ) -> WorkerResult<RenderOutput> {
        logger.log_start("two sources");
        let program = self.compile_dual_spec(&request.bound_spec()).await?;
        self.execute(&program, render_id, logger, on_progress).await
    }

    async fn compile_dual_spec(&self, spec: &DualSourceSpec) -> WorkerResult<CompiledProgram> {
        ensure_inputs_exist(&spec.input_paths())?;
        let primary = self
            .source_info(&spec.primary, spec.primary_duration, spec.primary_has_audio, spec.primary_volume)
            .await?;
        let secondary = self
            .source_info(
                &spec.secondary,
                spec.secondary_duration,
                spec.secondary_has_audio,
                spec.secondary_volume,
            )
            .await?;
        Ok(self.compiler.compile_dual(spec, primary, secondary)?)
    }

    /// The source is inspected unless its duration and audio presence are both known.
    /// A muted source needs no audio answer.
    async fn source_info(
        &self,
        path: &Path,
        duration: Option<f64>,
        has_audio: Option<bool>,
        volume: f64,
    ) -> WorkerResult<SourceInfo> {
        let has_audio = has_audio.or((volume <= 0.0).then_some(false));
        if let (Some(duration), Some(has_audio)) = (duration, has_audio) {
            return Ok(SourceInfo { duration, has_audio });
        }

        debug!(path = %path.display(), "Inspecting source");
        let info = probe_media(&self.config.ffprobe_binary, path).await?;
        Ok(SourceInfo {
            duration: duration.unwrap_or(info.duration),
            has_audio: has_audio.unwrap_or(info.has_audio),
        })
    }

    async fn execute(
        &self,
        program: &CompiledProgram,
        render_id: &RenderId,
        logger: &RenderLogger,
        on_progress: ProgressCallback,
    ) -> WorkerResult<RenderOutput> {
        tokio::fs::create_dir_all(&self.config.output_dir).await?;

        let file_name = render_id.file_name();
        let output = self.config.output_dir.join(&file_name);
        let request = FfmpegCommand::from_program(program, &output).into_request(program.total_duration);

        let progress_logger = logger.clone();
        let on_progress: ProgressCallback = Box::new(move |progress| {
            progress_logger.log_progress(progress.percent);
            on_progress(progress);
        });

        if let Err(e) = self.engine.run(request, on_progress).await {
            discard_partial(&output).await;
            return Err(e.into());
        }

        if !tokio::fs::try_exists(&output).await.unwrap_or(false) {
            discard_partial(&output).await;
            return Err(MediaError::MissingOutput(output).into());
        }

        Ok(RenderOutput {
            url: self.config.public_url(&file_name),
            output_path: output,
            duration: program.total_duration,
            completed_at: Utc::now(),
        })
    }
}

/// Missing inputs are reported before anything is compiled or spawned.
fn ensure_inputs_exist(paths: &[PathBuf]) -> Result<(), MediaError> {
    match paths.iter().find(|p| !p.exists()) {
        Some(missing) => Err(MediaError::FileNotFound(missing.clone())),
        None => Ok(()),
    }
}

/// Best-effort removal of a half-written reel after a failed or cancelled run.
async fn discard_partial(output: &Path) {
    match tokio::fs::remove_file(output).await {
        Ok(()) => debug!(path = %output.display(), "Removed partial output"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %output.display(), error = %e, "Could not remove partial output"),
    }
}

async fn finish(
    result: WorkerResult<RenderOutput>,
    uploads: TempFileSet,
    logger: &RenderLogger,
) -> WorkerResult<RenderOutput> {
    let report = uploads.cleanup().await;
    debug!(
        render_id = %logger.render_id(),
        attempted = report.attempted,
        failed = report.failed,
        "Upload cleanup finished"
    );
    if report.failed > 0 {
        logger.log_warning(&format!("{} uploads could not be removed", report.failed));
    }

    match &result {
        Ok(output) => logger.log_completion(&format!(
            "{} ({})",
            output.output_path.display(),
            format_seconds(output.duration)
        )),
        Err(e) => logger.log_error(&format!("{} ({})", e, e.kind())),
    }
    result
}
