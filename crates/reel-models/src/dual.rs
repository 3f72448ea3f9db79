//! Two-source composition: two uploaded videos stacked on one canvas.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::composition::is_hex_color;
use crate::quality::QualityTier;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DualSourceSpec {
    /// Top video
    pub primary: PathBuf,
    /// Bottom video
    pub secondary: PathBuf,

    #[serde(default = "default_volume")]
    pub primary_volume: f64,
    #[serde(default = "default_volume")]
    pub secondary_volume: f64,

    /// Known source lengths; inspected when absent
    #[serde(default)]
    pub primary_duration: Option<f64>,
    #[serde(default)]
    pub secondary_duration: Option<f64>,

    /// Known audio presence; inspected when absent and the source is audible
    #[serde(default)]
    pub primary_has_audio: Option<bool>,
    #[serde(default)]
    pub secondary_has_audio: Option<bool>,

    #[serde(default = "default_background")]
    pub background_color: String,

    #[serde(default)]
    #[schemars(with = "String")]
    pub quality: QualityTier,
}

fn default_volume() -> f64 {
    1.0
}

fn default_background() -> String {
    "#000000".to_string()
}

impl DualSourceSpec {
    /// Inputs in engine order: primary, then secondary.
    pub fn input_paths(&self) -> Vec<PathBuf> {
        vec![self.primary.clone(), self.secondary.clone()]
    }

    /// Output length: the stack ends with the shorter source.
    pub fn total_duration(&self) -> Option<f64> {
        match (self.primary_duration, self.secondary_duration) {
            (Some(a), Some(b)) => Some(a.min(b)),
            _ => None,
        }
    }

    /// Check volumes, known durations and the background color.
    pub fn validate(&self) -> Result<(), String> {
        if self.primary.as_os_str().is_empty() || self.secondary.as_os_str().is_empty() {
            return Err("Exactly two source videos are required".to_string());
        }

        for (name, volume) in [("primary", self.primary_volume), ("secondary", self.secondary_volume)] {
            if !volume.is_finite() || volume < 0.0 {
                return Err(format!("{} volume must be non-negative", name));
            }
        }

        for duration in [self.primary_duration, self.secondary_duration].into_iter().flatten() {
            if !duration.is_finite() || duration <= 0.0 {
                return Err(format!("Source duration must be positive, got {}", duration));
            }
        }

        if !is_hex_color(&self.background_color) {
            return Err(format!("Invalid background color: {}", self.background_color));
        }

        Ok(())
    }
}
