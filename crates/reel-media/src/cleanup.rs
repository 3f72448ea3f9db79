//! Per-request temp file lifecycle.
//!
//! A [`TempFileSet`] is created when uploads are accepted and makes exactly
//! one best-effort removal attempt per path when the request ends, whether
//! through [`TempFileSet::cleanup`] or, as a fallback, on drop. Removal
//! failures are logged and never returned.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

/// Deletes files. Swappable so tests can observe removal attempts.
#[async_trait]
pub trait FileRemover: Send + Sync {
    async fn remove(&self, path: &Path) -> io::Result<()>;

    /// Blocking removal used from `Drop`.
    fn remove_now(&self, path: &Path) -> io::Result<()>;
}

/// Removes files from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsRemover;

#[async_trait]
impl FileRemover for FsRemover {
    async fn remove(&self, path: &Path) -> io::Result<()> {
        tokio::fs::remove_file(path).await
    }

    fn remove_now(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }
}

/// Outcome of one cleanup pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub attempted: usize,
    pub removed: usize,
    pub failed: usize,
}

/// Upload paths owned by one request.
pub struct TempFileSet {
    paths: Vec<PathBuf>,
    remover: Arc<dyn FileRemover>,
    cleaned: bool,
}

impl TempFileSet {
    /// Empty set using the filesystem remover.
    pub fn new() -> Self {
        Self::from_paths(Vec::new())
    }

    /// Track `paths`, removed through the filesystem by default.
    pub fn from_paths(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            paths: paths.into_iter().collect(),
            remover: Arc::new(FsRemover),
            cleaned: false,
        }
    }

    /// Replace the remover, e.g. with a test double.
    pub fn with_remover(mut self, remover: Arc<dyn FileRemover>) -> Self {
        self.remover = remover;
        self
    }

    /// Track another path; duplicates are tracked once.
    pub fn track(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if !self.paths.contains(&path) {
            self.paths.push(path);
        }
    }

    /// Tracked paths in insertion order.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Number of tracked paths.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Whether nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// One removal attempt per tracked path. Never fails.
    pub async fn cleanup(mut self) -> CleanupReport {
        self.cleaned = true;
        let mut report = CleanupReport::default();

        for path in &self.paths {
            report.attempted += 1;
            match self.remover.remove(path).await {
                Ok(()) => {
                    report.removed += 1;
                    debug!(path = %path.display(), "Removed temp file");
                }
                Err(e) => {
                    report.failed += 1;
                    log_failure(path, &e);
                }
            }
        }

        report
    }
}

impl Default for TempFileSet {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TempFileSet {
    fn drop(&mut self) {
        if self.cleaned || self.paths.is_empty() {
            return;
        }

        warn!(
            count = self.paths.len(),
            "TempFileSet dropped without cleanup(), removing files synchronously"
        );
        for path in &self.paths {
            if let Err(e) = self.remover.remove_now(path) {
                log_failure(path, &e);
            }
        }
    }
}

fn log_failure(path: &Path, e: &io::Error) {
    if e.kind() == io::ErrorKind::NotFound {
        debug!(path = %path.display(), "Temp file already gone");
    } else {
        warn!(path = %path.display(), "Failed to remove temp file: {}", e);
    }
}
