//! FFmpeg command line and process runner.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStderr, Command};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{MediaError, MediaResult};
use crate::graph::CompiledProgram;
use crate::progress::{ProgressCallback, ProgressTracker};

/// Characters of stderr kept for failure reports.
pub const STDERR_TAIL_CHARS: usize = 2000;

/// Flat FFmpeg argument list for one compiled program.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    args: Vec<String>,
    output: PathBuf,
}

impl FfmpegCommand {
    /// Inputs, filter program, stream maps, encoding bundle, output.
    pub fn from_program(program: &CompiledProgram, output: impl AsRef<Path>) -> Self {
        let output = output.as_ref().to_path_buf();
        let mut args = vec!["-hide_banner".to_string(), "-y".to_string()];

        for input in &program.inputs {
            args.extend(input.options.iter().cloned());
            args.push("-i".to_string());
            args.push(input.path.to_string_lossy().to_string());
        }

        args.push("-filter_complex".to_string());
        args.push(program.filter_graph());

        args.push("-map".to_string());
        args.push(program.video_out.bracketed());
        if let Some(audio) = &program.audio_out {
            args.push("-map".to_string());
            args.push(audio.bracketed());
        }

        args.extend(program.encoding.to_ffmpeg_args(program.audio_out.is_some()));
        args.push(output.to_string_lossy().to_string());

        Self { args, output }
    }

    /// Arguments after the binary name.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// File the command writes.
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Everything the runner needs to execute this command.
    pub fn into_request(self, total_duration: f64) -> EngineRequest {
        EngineRequest {
            args: self.args,
            output: self.output,
            total_duration,
        }
    }
}

/// One engine invocation.
#[derive(Debug, Clone)]
pub struct EngineRequest {
    pub args: Vec<String>,
    pub output: PathBuf,
    /// Progress denominator in seconds
    pub total_duration: f64,
}

/// Runs the encoding engine. Implemented by [`FfmpegRunner`] and by test doubles.
#[async_trait]
pub trait EngineRunner: Send + Sync {
    /// Run to completion. `Ok` means the engine exited with status 0.
    async fn run(&self, request: EngineRequest, on_progress: ProgressCallback) -> MediaResult<()>;
}

/// Runner for FFmpeg commands with progress tracking and cancellation.
#[derive(Debug, Clone)]
pub struct FfmpegRunner {
    binary: String,
    cancel_rx: Option<watch::Receiver<bool>>,
}

impl Default for FfmpegRunner {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl FfmpegRunner {
    /// Runner for the given binary name or path.
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            cancel_rx: None,
        }
    }

    /// Kill the process when the signal turns `true`.
    pub fn with_cancel(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.cancel_rx = Some(cancel_rx);
        self
    }

    async fn wait_for_completion(&self, child: &mut Child) -> MediaResult<std::process::ExitStatus> {
        let Some(mut cancel_rx) = self.cancel_rx.clone() else {
            return Ok(child.wait().await?);
        };

        tokio::select! {
            status = child.wait() => return Ok(status?),
            _ = cancelled(&mut cancel_rx) => {}
        }

        info!("FFmpeg cancelled, killing process");
        if let Err(e) = child.kill().await {
            warn!("Failed to kill FFmpeg: {}", e);
        }
        Err(MediaError::Cancelled)
    }
}

#[async_trait]
impl EngineRunner for FfmpegRunner {
    async fn run(&self, request: EngineRequest, on_progress: ProgressCallback) -> MediaResult<()> {
        let binary = which::which(&self.binary)
            .map_err(|_| MediaError::FfmpegNotFound(self.binary.clone()))?;

        debug!("Running FFmpeg: {} {}", binary.display(), request.args.join(" "));

        let mut child = Command::new(&binary)
            .args(&request.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| MediaError::spawn_failed(format!("{}: {}", binary.display(), e)))?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::internal("FFmpeg stderr was not captured"))?;
        let stdout = child.stdout.take();

        // Nothing useful is written to stdout; keep the pipe from filling up.
        let drain = tokio::spawn(async move {
            if let Some(mut stdout) = stdout {
                let _ = tokio::io::copy(&mut stdout, &mut tokio::io::sink()).await;
            }
        });

        let tracker = ProgressTracker::new(request.total_duration);
        let monitor = tokio::spawn(monitor_stderr(stderr, tracker, on_progress));

        let waited = self.wait_for_completion(&mut child).await;

        let (tail, mut tracker, on_progress) = monitor
            .await
            .map_err(|e| MediaError::internal(format!("stderr monitor failed: {}", e)))?;
        let _ = drain.await;

        let status = waited?;
        if !status.success() {
            warn!(exit_code = ?status.code(), "FFmpeg exited with failure");
            return Err(MediaError::ffmpeg_failed(
                format!("FFmpeg exited with {}", status),
                Some(tail),
                status.code(),
            ));
        }

        if let Some(progress) = tracker.finish() {
            on_progress(progress);
        }

        Ok(())
    }
}

/// Resolves once the cancel signal is `true`; never resolves if the sender is gone.
async fn cancelled(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Read stderr in chunks (FFmpeg ends progress lines with `\r`), report
/// progress and keep a bounded tail for error reports.
async fn monitor_stderr(
    mut stderr: ChildStderr,
    mut tracker: ProgressTracker,
    on_progress: ProgressCallback,
) -> (String, ProgressTracker, ProgressCallback) {
    let mut tail = StderrTail::new(STDERR_TAIL_CHARS);
    let mut buf = [0u8; 4096];

    loop {
        match stderr.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                tail.push(&String::from_utf8_lossy(&buf[..n]));
                if let Some(progress) = tracker.observe_text(tail.as_str()) {
                    on_progress(progress);
                }
            }
            Err(e) => {
                warn!("Failed to read FFmpeg stderr: {}", e);
                break;
            }
        }
    }

    (tail.into_string(), tracker, on_progress)
}

/// Last `limit` characters of a growing text stream.
#[derive(Debug, Clone)]
pub struct StderrTail {
    buf: String,
    limit: usize,
}

impl StderrTail {
    /// Keep at most `limit` bytes.
    pub fn new(limit: usize) -> Self {
        Self {
            buf: String::new(),
            limit,
        }
    }

    /// Append output, dropping the oldest bytes past the limit.
    pub fn push(&mut self, chunk: &str) {
        self.buf.push_str(chunk);
        let excess = self.buf.chars().count().saturating_sub(self.limit);
        if excess > 0 {
            let cut = self
                .buf
                .char_indices()
                .nth(excess)
                .map(|(i, _)| i)
                .unwrap_or(self.buf.len());
            self.buf.drain(..cut);
        }
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    /// Retained tail.
    pub fn into_string(self) -> String {
        self.buf
    }
}

/// Check if FFmpeg is available.
pub fn check_ffmpeg(binary: &str) -> MediaResult<PathBuf> {
    which::which(binary).map_err(|_| MediaError::FfmpegNotFound(binary.to_string()))
}

/// Check if FFprobe is available.
pub fn check_ffprobe(binary: &str) -> MediaResult<PathBuf> {
    which::which(binary).map_err(|_| MediaError::FfprobeNotFound(binary.to_string()))
}
