//! FFmpeg progress parsing.
//!
//! FFmpeg reports its output position on stderr as `time=HH:MM:SS.ff`.
//! The tracker turns the latest marker into an integer percentage of the
//! composition length and only reports values that strictly increase.

use std::sync::OnceLock;

use regex::Regex;

use reel_models::timestamp::parse_timestamp;
use reel_models::RenderProgress;

/// Callback type for progress updates.
pub type ProgressCallback = Box<dyn Fn(RenderProgress) + Send + 'static>;

fn time_marker() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| {
        Regex::new(r"time=\s*(\d+:\d{2}:\d{2}(?:\.\d+)?)").expect("time marker pattern is valid")
    })
}

/// Seconds of the most recent `time=` marker in `text`.
pub fn latest_time_marker(text: &str) -> Option<f64> {
    time_marker()
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .last()
        .and_then(|m| parse_timestamp(m.as_str()).ok())
}

/// Percentage of `total` covered by `seconds`, clamped to `[0, 100]`.
pub fn percent_of(seconds: f64, total: f64) -> u8 {
    if total <= 0.0 || !seconds.is_finite() {
        return 0;
    }
    (seconds / total * 100.0).clamp(0.0, 100.0).floor() as u8
}

/// Monotonic progress state of one render.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    total_duration: f64,
    last: Option<u8>,
}

impl ProgressTracker {
    /// Tracker for a render of `total_duration` seconds.
    pub fn new(total_duration: f64) -> Self {
        Self {
            total_duration,
            last: None,
        }
    }

    /// Feed an encoder position; returns a value only when it beats the last one.
    pub fn observe_seconds(&mut self, seconds: f64) -> Option<RenderProgress> {
        self.advance(percent_of(seconds, self.total_duration))
    }

    /// Feed accumulated diagnostic text; the latest marker wins.
    pub fn observe_text(&mut self, text: &str) -> Option<RenderProgress> {
        latest_time_marker(text).and_then(|s| self.observe_seconds(s))
    }

    /// Report completion if 100 was not reached through markers.
    pub fn finish(&mut self) -> Option<RenderProgress> {
        self.advance(100)
    }

    /// Last percentage handed out, if any.
    pub fn last_reported(&self) -> Option<u8> {
        self.last
    }

    fn advance(&mut self, percent: u8) -> Option<RenderProgress> {
        match self.last {
            Some(last) if percent <= last => None,
            _ => {
                self.last = Some(percent);
                Some(RenderProgress { percent })
            }
        }
    }
}
