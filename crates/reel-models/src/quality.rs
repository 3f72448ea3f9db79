//! Output quality tiers and the encoding parameters bound to them.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default video codec (H.264)
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
/// Default audio codec
pub const DEFAULT_AUDIO_CODEC: &str = "aac";
/// Default audio bitrate
pub const DEFAULT_AUDIO_BITRATE: &str = "192k";
/// Output frame rate shared by every tier
pub const OUTPUT_FRAME_RATE: u32 = 30;
/// Broadly compatible pixel format for the final stream
pub const OUTPUT_PIXEL_FORMAT: &str = "yuv420p";

/// Output quality tier.
///
/// The set is closed: unrecognized names deserialize to [`QualityTier::P1080`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum QualityTier {
    P720,
    #[default]
    P1080,
    K4,
}

impl QualityTier {
    pub const ALL: &'static [QualityTier] = &[QualityTier::P720, QualityTier::P1080, QualityTier::K4];

    /// Resolve a tier by name, falling back to 1080p.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "720p" => QualityTier::P720,
            "1080p" => QualityTier::P1080,
            "4k" => QualityTier::K4,
            _ => QualityTier::P1080,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QualityTier::P720 => "720p",
            QualityTier::P1080 => "1080p",
            QualityTier::K4 => "4k",
        }
    }

    /// Encoding parameters for this tier.
    pub fn profile(&self) -> EncodingProfile {
        let (width, height, crf, preset, bitrate) = match self {
            QualityTier::P720 => (720, 1280, 23, "fast", "3M"),
            QualityTier::P1080 => (1080, 1920, 18, "medium", "8M"),
            QualityTier::K4 => (2160, 3840, 15, "slow", "20M"),
        };
        EncodingProfile {
            width,
            height,
            crf,
            preset: preset.to_string(),
            bitrate: bitrate.to_string(),
            codec: DEFAULT_VIDEO_CODEC.to_string(),
            audio_codec: DEFAULT_AUDIO_CODEC.to_string(),
            audio_bitrate: DEFAULT_AUDIO_BITRATE.to_string(),
            frame_rate: OUTPUT_FRAME_RATE,
            pixel_format: OUTPUT_PIXEL_FORMAT.to_string(),
        }
    }
}

impl From<String> for QualityTier {
    fn from(value: String) -> Self {
        Self::from_name(&value)
    }
}

impl From<QualityTier> for String {
    fn from(value: QualityTier) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Resolved encoding bundle for one render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EncodingProfile {
    pub width: u32,
    pub height: u32,
    /// Constant Rate Factor (quality, 0-51, lower is better)
    pub crf: u8,
    /// Encoder preset (e.g., "fast", "medium", "slow")
    pub preset: String,
    /// Target video bitrate in FFmpeg notation (e.g., "8M")
    pub bitrate: String,
    pub codec: String,
    pub audio_codec: String,
    pub audio_bitrate: String,
    pub frame_rate: u32,
    pub pixel_format: String,
}

impl EncodingProfile {
    /// Rate-control buffer size: twice the target bitrate, same unit.
    pub fn buffer_size(&self) -> String {
        let split = self
            .bitrate
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .unwrap_or(self.bitrate.len());
        let (number, unit) = self.bitrate.split_at(split);
        match number.parse::<f64>() {
            Ok(n) => format!("{}{}", trim_float(n * 2.0), unit),
            Err(_) => self.bitrate.clone(),
        }
    }

    /// Convert to FFmpeg output arguments.
    ///
    /// Audio codec arguments are only emitted when the output carries audio.
    pub fn to_ffmpeg_args(&self, with_audio: bool) -> Vec<String> {
        let mut args = vec![
            "-c:v".to_string(),
            self.codec.clone(),
            "-preset".to_string(),
            self.preset.clone(),
            "-crf".to_string(),
            self.crf.to_string(),
            "-b:v".to_string(),
            self.bitrate.clone(),
            "-maxrate".to_string(),
            self.bitrate.clone(),
            "-bufsize".to_string(),
            self.buffer_size(),
            "-r".to_string(),
            self.frame_rate.to_string(),
            "-pix_fmt".to_string(),
            self.pixel_format.clone(),
            "-movflags".to_string(),
            "+faststart".to_string(),
        ];

        if with_audio {
            args.extend_from_slice(&[
                "-c:a".to_string(),
                self.audio_codec.clone(),
                "-b:a".to_string(),
                self.audio_bitrate.clone(),
            ]);
        }

        args
    }
}

fn trim_float(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}
