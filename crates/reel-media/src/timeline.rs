//! Absolute clip windows on the composition timeline.

use crate::error::{MediaError, MediaResult};

/// Half-open `[start, end)` interval of one clip, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipWindow {
    pub start: f64,
    pub end: f64,
}

impl ClipWindow {
    /// Window length in seconds.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Clip index → absolute window, computed once per compile.
///
/// Every builder that gates something to a clip reads its window from here.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipTimeline {
    windows: Vec<ClipWindow>,
}

impl ClipTimeline {
    /// Running sum over clip durations.
    pub fn build(durations: &[f64]) -> MediaResult<Self> {
        let mut windows = Vec::with_capacity(durations.len());
        let mut start = 0.0;
        for (i, &duration) in durations.iter().enumerate() {
            if !duration.is_finite() || duration < 0.0 {
                return Err(MediaError::invalid_composition(format!(
                    "Clip {} has invalid duration {}",
                    i, duration
                )));
            }
            let end = start + duration;
            windows.push(ClipWindow { start, end });
            start = end;
        }
        Ok(Self { windows })
    }

    /// Window of clip `index`.
    pub fn window(&self, index: usize) -> Option<ClipWindow> {
        self.windows.get(index).copied()
    }

    /// All windows in clip order.
    pub fn windows(&self) -> &[ClipWindow] {
        &self.windows
    }

    /// Length of clip `index`.
    pub fn duration(&self, index: usize) -> Option<f64> {
        self.window(index).map(|w| w.duration())
    }

    /// Sum of all clip durations.
    pub fn total_duration(&self) -> f64 {
        self.windows.last().map(|w| w.end).unwrap_or(0.0)
    }

    /// Number of clips.
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    /// Whether the timeline has no clips.
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}
