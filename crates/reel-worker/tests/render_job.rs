//! Render job behaviour against a scripted engine.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;
use tempfile::TempDir;

use reel_media::{
    EngineRequest, EngineRunner, FileRemover, MediaError, MediaResult, ProgressCallback,
    ProgressTracker, TempFileSet,
};
use reel_models::{FailureKind, RenderProgress};
use reel_worker::{DualRenderRequest, RenderConfig, RenderJob, RenderRequest};

#[derive(Debug, Clone, Copy)]
enum Outcome {
    Success,
    SpawnError,
    NonZeroExit,
    Cancelled,
    NoOutput,
}

/// Engine double: reports scripted positions, then ends as told.
struct ScriptedEngine {
    outcome: Outcome,
    positions: Vec<f64>,
    requests: Mutex<Vec<EngineRequest>>,
}

impl ScriptedEngine {
    fn new(outcome: Outcome) -> Self {
        Self {
            outcome,
            positions: Vec::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn with_positions(mut self, positions: &[f64]) -> Self {
        self.positions = positions.to_vec();
        self
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl EngineRunner for ScriptedEngine {
    async fn run(&self, request: EngineRequest, on_progress: ProgressCallback) -> MediaResult<()> {
        self.requests.lock().unwrap().push(request.clone());

        if let Outcome::SpawnError = self.outcome {
            return Err(MediaError::spawn_failed("No such file or directory"));
        }

        let mut tracker = ProgressTracker::new(request.total_duration);
        for seconds in &self.positions {
            if let Some(progress) = tracker.observe_seconds(*seconds) {
                on_progress(progress);
            }
        }

        match self.outcome {
            Outcome::NonZeroExit => {
                tokio::fs::write(&request.output, b"partial").await?;
                Err(MediaError::ffmpeg_failed(
                    "FFmpeg exited with exit status: 1",
                    Some("Error initializing complex filters".to_string()),
                    Some(1),
                ))
            }
            Outcome::Cancelled => {
                tokio::fs::write(&request.output, b"partial").await?;
                Err(MediaError::Cancelled)
            }
            Outcome::Success => {
                tokio::fs::write(&request.output, b"mp4").await?;
                if let Some(progress) = tracker.finish() {
                    on_progress(progress);
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

#[derive(Default)]
struct CountingRemover {
    calls: Mutex<HashMap<PathBuf, usize>>,
}

impl CountingRemover {
    fn count(&self, path: &Path) -> usize {
        self.calls.lock().unwrap().get(path).copied().unwrap_or(0)
    }

    fn record(&self, path: &Path) -> io::Result<()> {
        *self.calls.lock().unwrap().entry(path.to_path_buf()).or_default() += 1;
        std::fs::remove_file(path)
    }
}

#[async_trait]
impl FileRemover for CountingRemover {
    async fn remove(&self, path: &Path) -> io::Result<()> {
        self.record(path)
    }

    fn remove_now(&self, path: &Path) -> io::Result<()> {
        self.record(path)
    }
}

struct Fixture {
    dir: TempDir,
    uploads: Vec<PathBuf>,
}

impl Fixture {
    fn new(count: usize) -> Self {
        let dir = TempDir::new().unwrap();
        let uploads = (0..count)
            .map(|i| {
                let path = dir.path().join(format!("upload_{}.mp4", i));
                std::fs::write(&path, b"clip").unwrap();
                path
            })
            .collect();
        Self { dir, uploads }
    }

    fn config(&self) -> RenderConfig {
        RenderConfig {
            output_dir: self.dir.path().join("output"),
            ..RenderConfig::default()
        }
    }

    fn request(&self, durations: &[f64]) -> RenderRequest {
        let clips: Vec<_> = durations
            .iter()
            .map(|d| json!({ "source": "placeholder.mp4", "duration": d }))
            .collect();
        serde_json::from_value(json!({
            "composition": { "clips": clips, "quality": "1080p" },
            "clipFiles": self.uploads,
        }))
        .unwrap()
    }

    fn temp_set(&self, remover: &Arc<CountingRemover>) -> TempFileSet {
        TempFileSet::from_paths(self.uploads.clone()).with_remover(remover.clone())
    }

    /// Reels left in the output directory.
    fn reels(&self) -> Vec<PathBuf> {
        match std::fs::read_dir(self.dir.path().join("output")) {
            Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
            Err(_) => Vec::new(),
        }
    }

    fn assert_each_removed_once(&self, remover: &CountingRemover) {
        for path in &self.uploads {
            assert_eq!(remover.count(path), 1, "{}", path.display());
            assert!(!path.exists());
        }
    }
}

fn recorder() -> (Arc<Mutex<Vec<u8>>>, ProgressCallback) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let callback: ProgressCallback = Box::new(move |p: RenderProgress| sink.lock().unwrap().push(p.percent));
    (seen, callback)
}

#[tokio::test]
async fn test_two_clip_render_succeeds() {
    let fixture = Fixture::new(2);
    let engine = Arc::new(ScriptedEngine::new(Outcome::Success));
    let job = RenderJob::new(fixture.config(), engine.clone());
    let remover = Arc::new(CountingRemover::default());

    let request = fixture.request(&[5.0, 5.0]);
    let program = job.compile_only(&request).unwrap();
    assert_eq!(program.stages_using("concat").len(), 1);
    assert_eq!(program.stages_using("format").len(), 1);

    let output = job
        .render(request, fixture.temp_set(&remover), Box::new(|_| {}))
        .await
        .unwrap();

    assert_eq!(output.duration, 10.0);
    let id = output
        .url
        .strip_prefix("/downloads/reel_")
        .and_then(|rest| rest.strip_suffix(".mp4"))
        .unwrap();
    assert!(uuid::Uuid::parse_str(id).is_ok());
    assert!(output.output_path.exists());
    assert_eq!(engine.calls(), 1);
    fixture.assert_each_removed_once(&remover);
}

#[tokio::test]
async fn test_spawn_error_cleans_up() {
    let fixture = Fixture::new(2);
    let job = RenderJob::new(fixture.config(), Arc::new(ScriptedEngine::new(Outcome::SpawnError)));
    let remover = Arc::new(CountingRemover::default());

    let err = job
        .render(fixture.request(&[2.0, 3.0]), fixture.temp_set(&remover), Box::new(|_| {}))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), FailureKind::Spawn);
    fixture.assert_each_removed_once(&remover);
}

#[tokio::test]
async fn test_non_zero_exit_cleans_up_and_keeps_tail() {
    let fixture = Fixture::new(2);
    let engine = ScriptedEngine::new(Outcome::NonZeroExit).with_positions(&[1.0, 2.0]);
    let job = RenderJob::new(fixture.config(), Arc::new(engine));
    let remover = Arc::new(CountingRemover::default());

    let err = job
        .render(fixture.request(&[2.0, 3.0]), fixture.temp_set(&remover), Box::new(|_| {}))
        .await
        .unwrap_err();

    let failure = err.to_failure();
    assert_eq!(failure.kind, FailureKind::Encode);
    assert!(failure.stderr_tail.unwrap().contains("complex filters"));
    assert!(fixture.reels().is_empty(), "{:?}", fixture.reels());
    fixture.assert_each_removed_once(&remover);
}

#[tokio::test]
async fn test_cancelled_render_discards_partial_reel() {
    let fixture = Fixture::new(1);
    let engine = ScriptedEngine::new(Outcome::Cancelled).with_positions(&[0.5]);
    let job = RenderJob::new(fixture.config(), Arc::new(engine));
    let remover = Arc::new(CountingRemover::default());

    let err = job
        .render(fixture.request(&[4.0]), fixture.temp_set(&remover), Box::new(|_| {}))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), FailureKind::Cancelled);
    assert!(fixture.reels().is_empty(), "{:?}", fixture.reels());
    fixture.assert_each_removed_once(&remover);
}

#[tokio::test]
async fn test_compile_error_never_spawns_and_cleans_up() {
    let fixture = Fixture::new(2);
    let engine = Arc::new(ScriptedEngine::new(Outcome::Success));
    let job = RenderJob::new(fixture.config(), engine.clone());
    let remover = Arc::new(CountingRemover::default());

    let err = job
        .render(fixture.request(&[2.0, 0.0]), fixture.temp_set(&remover), Box::new(|_| {}))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), FailureKind::Configuration);
    assert_eq!(engine.calls(), 0);
    fixture.assert_each_removed_once(&remover);
}

#[tokio::test]
async fn test_missing_upload_is_configuration_error() {
    let fixture = Fixture::new(2);
    std::fs::remove_file(&fixture.uploads[1]).unwrap();
    let engine = Arc::new(ScriptedEngine::new(Outcome::Success));
    let job = RenderJob::new(fixture.config(), engine.clone());
    let remover = Arc::new(CountingRemover::default());

    let err = job
        .render(fixture.request(&[2.0, 3.0]), fixture.temp_set(&remover), Box::new(|_| {}))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), FailureKind::Configuration);
    assert_eq!(engine.calls(), 0);
    assert_eq!(remover.count(&fixture.uploads[0]), 1);
    assert_eq!(remover.count(&fixture.uploads[1]), 1);
}

#[tokio::test]
async fn test_exit_zero_without_output_is_not_success() {
    let fixture = Fixture::new(1);
    let job = RenderJob::new(fixture.config(), Arc::new(ScriptedEngine::new(Outcome::NoOutput)));
    let remover = Arc::new(CountingRemover::default());

    let err = job
        .render(fixture.request(&[4.0]), fixture.temp_set(&remover), Box::new(|_| {}))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), FailureKind::Encode);
    fixture.assert_each_removed_once(&remover);
}

#[tokio::test]
async fn test_progress_is_strictly_increasing() {
    let fixture = Fixture::new(2);
    let engine = ScriptedEngine::new(Outcome::Success).with_positions(&[1.0, 2.5, 2.0, 2.51, 6.0, 5.0, 9.9]);
    let job = RenderJob::new(fixture.config(), Arc::new(engine));
    let remover = Arc::new(CountingRemover::default());
    let (seen, callback) = recorder();

    job.render(fixture.request(&[5.0, 5.0]), fixture.temp_set(&remover), callback)
        .await
        .unwrap();

    let seen = seen.lock().unwrap().clone();
    assert_eq!(seen, vec![10, 25, 60, 99, 100]);
    assert!(seen.windows(2).all(|w| w[0] < w[1]));
}

#[tokio::test]
async fn test_dropped_render_still_removes_uploads() {
    let fixture = Fixture::new(2);
    let remover = Arc::new(CountingRemover::default());
    {
        let _uploads = fixture.temp_set(&remover);
    }
    fixture.assert_each_removed_once(&remover);
}

#[tokio::test]
async fn test_stacked_render_uses_shorter_source() {
    let fixture = Fixture::new(2);
    let engine = Arc::new(ScriptedEngine::new(Outcome::Success));
    let job = RenderJob::new(fixture.config(), engine.clone());
    let remover = Arc::new(CountingRemover::default());

    let request: DualRenderRequest = serde_json::from_value(json!({
        "spec": {
            "primary": "top.mp4",
            "secondary": "bottom.mp4",
            "primaryDuration": 12.0,
            "secondaryDuration": 9.0,
            "primaryHasAudio": true,
            "secondaryVolume": 0.0
        },
        "primaryFile": fixture.uploads[0],
        "secondaryFile": fixture.uploads[1],
    }))
    .unwrap();

    let output = job
        .render_dual(request, fixture.temp_set(&remover), Box::new(|_| {}))
        .await
        .unwrap();

    assert_eq!(output.duration, 9.0);
    let requests = engine.requests.lock().unwrap();
    assert_eq!(requests[0].total_duration, 9.0);
    assert!(requests[0].args.iter().any(|a| a.contains("vstack")));
    drop(requests);
    fixture.assert_each_removed_once(&remover);
}

#[tokio::test]
async fn test_silent_source_is_left_out_of_the_mix() {
    let fixture = Fixture::new(2);
    let engine = Arc::new(ScriptedEngine::new(Outcome::Success));
    let job = RenderJob::new(fixture.config(), engine.clone());
    let remover = Arc::new(CountingRemover::default());

    let request: DualRenderRequest = serde_json::from_value(json!({
        "spec": {
            "primary": "top.mp4",
            "secondary": "bottom.mp4",
            "primaryDuration": 6.0,
            "secondaryDuration": 8.0,
            "primaryHasAudio": false,
            "secondaryHasAudio": true,
            "secondaryVolume": 0.5
        },
        "primaryFile": fixture.uploads[0],
        "secondaryFile": fixture.uploads[1],
    }))
    .unwrap();

    job.render_dual(request, fixture.temp_set(&remover), Box::new(|_| {}))
        .await
        .unwrap();

    let requests = engine.requests.lock().unwrap();
    let graph = requests[0].args.iter().find(|a| a.contains("vstack")).unwrap();
    assert!(graph.contains("[1:a]volume=0.5[aout]"), "{}", graph);
    assert!(!graph.contains("[0:a]"), "{}", graph);
    drop(requests);
    fixture.assert_each_removed_once(&remover);
}

#[tokio::test]
async fn test_unknown_audio_presence_is_inspected() {
    let fixture = Fixture::new(2);
    let engine = Arc::new(ScriptedEngine::new(Outcome::Success));
    let config = RenderConfig {
        ffprobe_binary: "reel-missing-ffprobe".to_string(),
        ..fixture.config()
    };
    let job = RenderJob::new(config, engine.clone());
    let remover = Arc::new(CountingRemover::default());

    let request: DualRenderRequest = serde_json::from_value(json!({
        "spec": {
            "primary": "top.mp4",
            "secondary": "bottom.mp4",
            "primaryDuration": 6.0,
            "secondaryDuration": 8.0
        },
        "primaryFile": fixture.uploads[0],
        "secondaryFile": fixture.uploads[1],
    }))
    .unwrap();

    let err = job
        .render_dual(request, fixture.temp_set(&remover), Box::new(|_| {}))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        reel_worker::WorkerError::Media(MediaError::FfprobeNotFound(_))
    ));
    assert_eq!(engine.calls(), 0);
    fixture.assert_each_removed_once(&remover);
}
