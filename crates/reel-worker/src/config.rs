//! Render configuration.

use std::path::PathBuf;

use reel_media::FontPlatform;

/// Render configuration.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// FFmpeg binary name or path
    pub ffmpeg_binary: String,
    /// FFprobe binary name or path
    pub ffprobe_binary: String,
    /// Directory finished reels are written to
    pub output_dir: PathBuf,
    /// Prefix of the relative download URL
    pub public_url_prefix: String,
    /// Font layout used to resolve drawtext font files
    pub font_platform: FontPlatform,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            ffmpeg_binary: "ffmpeg".to_string(),
            ffprobe_binary: "ffprobe".to_string(),
            output_dir: PathBuf::from("/tmp/reel/output"),
            public_url_prefix: "/downloads".to_string(),
            font_platform: FontPlatform::host(),
        }
    }
}

impl RenderConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            ffmpeg_binary: std::env::var("REEL_FFMPEG").unwrap_or(defaults.ffmpeg_binary),
            ffprobe_binary: std::env::var("REEL_FFPROBE").unwrap_or(defaults.ffprobe_binary),
            output_dir: std::env::var("REEL_OUTPUT_DIR")
                .ok()
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            public_url_prefix: std::env::var("REEL_PUBLIC_URL_PREFIX")
                .ok()
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or(defaults.public_url_prefix),
            font_platform: std::env::var("REEL_FONT_PLATFORM")
                .ok()
                .map(|s| FontPlatform::from_name(&s))
                .unwrap_or(defaults.font_platform),
        }
    }

    /// Download URL for an output file name.
    pub fn public_url(&self, file_name: &str) -> String {
        format!("{}/{}", self.public_url_prefix, file_name)
    }
}
