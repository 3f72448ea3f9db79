//! Declarative composition request: clips, decorations, audio, quality.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::quality::QualityTier;

/// Default share of the frame height occupied by the video area.
pub const DEFAULT_VIDEO_HEIGHT_FRACTION: f64 = 0.7;
/// Default transition length in seconds.
pub const DEFAULT_TRANSITION_DURATION: f64 = 0.5;

/// One export job, immutable input to one compile.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompositionSpec {
    /// Ordered clips; clip `i` is input file `i` of the engine
    pub clips: Vec<ClipSpec>,

    #[serde(default)]
    pub title: Option<TitleSpec>,

    /// Canvas color as `#RRGGBB`
    #[serde(default = "default_background")]
    pub background_color: String,

    /// Share of the output height given to the video area (anchored at the bottom)
    #[serde(default = "default_video_height_fraction")]
    pub video_height_fraction: f64,

    #[serde(default)]
    #[schemars(with = "String")]
    pub quality: QualityTier,

    #[serde(default)]
    pub transition: Option<TransitionConfig>,

    #[serde(default)]
    pub ranking: Option<RankingConfig>,

    #[serde(default)]
    pub captions: Vec<CaptionSpec>,

    #[serde(default)]
    pub overlays: Vec<OverlaySpec>,

    /// Background music
    #[serde(default)]
    pub audio: Option<AudioConfig>,
}

fn default_background() -> String {
    "#000000".to_string()
}

fn default_video_height_fraction() -> f64 {
    DEFAULT_VIDEO_HEIGHT_FRACTION
}

impl CompositionSpec {
    /// Clip durations in timeline order.
    pub fn durations(&self) -> Vec<f64> {
        self.clips.iter().map(|c| c.duration).collect()
    }

    /// Total composition length in seconds.
    pub fn total_duration(&self) -> f64 {
        self.clips.iter().map(|c| c.duration).sum()
    }

    /// Every uploaded file this composition references.
    pub fn input_paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.clips.iter().map(|c| c.source.clone()).collect();
        if let Some(audio) = &self.audio {
            paths.push(audio.source.clone());
        }
        paths
    }

    /// Validate the request.
    pub fn validate(&self) -> Result<(), String> {
        if self.clips.is_empty() {
            return Err("At least one clip is required".to_string());
        }

        for (i, clip) in self.clips.iter().enumerate() {
            if clip.source.as_os_str().is_empty() {
                return Err(format!("Clip {} has no source file", i));
            }
            if !clip.duration.is_finite() || clip.duration <= 0.0 {
                return Err(format!("Clip {} duration must be positive, got {}", i, clip.duration));
            }
            if !clip.trim_start.is_finite() || clip.trim_start < 0.0 {
                return Err(format!("Clip {} trim start must be non-negative", i));
            }
        }

        if !(self.video_height_fraction > 0.0 && self.video_height_fraction <= 1.0) {
            return Err(format!(
                "Video height fraction must be in (0, 1], got {}",
                self.video_height_fraction
            ));
        }

        if !is_hex_color(&self.background_color) {
            return Err(format!("Invalid background color: {}", self.background_color));
        }

        if let Some(title) = &self.title {
            title.position.validate("title")?;
            check_font_size("Title", title.style.font_size)?;
            check_color("Title color", &title.style.color)?;
            if let Some(stroke) = &title.style.stroke_color {
                check_color("Title stroke color", stroke)?;
            }
        }

        if let Some(ranking) = &self.ranking {
            if !ranking.size.is_finite() || ranking.size <= 0.0 {
                return Err("Ranking badge size must be positive".to_string());
            }
            check_color("Ranking color", &ranking.color)?;
            check_color("Ranking text color", &ranking.text_color)?;
        }

        for (i, caption) in self.captions.iter().enumerate() {
            if caption.clip_index >= self.clips.len() {
                return Err(format!(
                    "Caption references clip {} but only {} clips exist",
                    caption.clip_index,
                    self.clips.len()
                ));
            }
            check_font_size(&format!("Caption {}", i), caption.font_size)?;
            check_color(&format!("Caption {} color", i), &caption.color)?;
            check_color(&format!("Caption {} background color", i), &caption.background_color)?;
        }

        let total = self.total_duration();
        for (i, overlay) in self.overlays.iter().enumerate() {
            let start = overlay.start.unwrap_or(0.0);
            let end = overlay.end.unwrap_or(total);
            if !start.is_finite() || !end.is_finite() || start < 0.0 {
                return Err(format!("Overlay {} window must be finite and non-negative", i));
            }
            if start >= end {
                return Err(format!("Overlay {} start must be before end", i));
            }
            if start >= total {
                return Err(format!(
                    "Overlay {} starts at {} but the composition ends at {}",
                    i, start, total
                ));
            }
            if let Some(position) = &overlay.position {
                position.validate("overlay")?;
            }
            check_font_size(&format!("Overlay {}", i), overlay.font_size)?;
            check_color(&format!("Overlay {} color", i), &overlay.color)?;
            check_color(&format!("Overlay {} background color", i), &overlay.background_color)?;
        }

        if let Some(audio) = &self.audio {
            if audio.source.as_os_str().is_empty() {
                return Err("Background audio has no source file".to_string());
            }
            if !audio.volume.is_finite() || audio.volume < 0.0 {
                return Err("Background audio volume must be non-negative".to_string());
            }
        }

        Ok(())
    }
}

/// One trimmed source clip.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClipSpec {
    /// Uploaded source file
    pub source: PathBuf,
    /// Offset into the source in seconds
    #[serde(default)]
    pub trim_start: f64,
    /// Seconds of the source to use
    pub duration: f64,
}

/// Position relative to the output frame, in percent (0-100).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RelativePosition {
    pub x: f64,
    pub y: f64,
}

impl RelativePosition {
    fn validate(&self, what: &str) -> Result<(), String> {
        let in_range = |v: f64| v.is_finite() && (0.0..=100.0).contains(&v);
        if !in_range(self.x) || !in_range(self.y) {
            return Err(format!("{} position must be within 0-100%", what));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TitleSpec {
    pub text: String,
    #[serde(default)]
    pub style: TitleStyle,
    #[serde(default = "default_title_position")]
    pub position: RelativePosition,
}

fn default_title_position() -> RelativePosition {
    RelativePosition { x: 50.0, y: 10.0 }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TitleStyle {
    #[serde(default = "default_font_family")]
    pub font_family: String,
    /// Preview font size at the 1080px reference width
    #[serde(default = "default_title_font_size")]
    pub font_size: f64,
    #[serde(default = "default_text_color")]
    pub color: String,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub stroke_color: Option<String>,
    #[serde(default)]
    pub stroke_width: u32,
}

impl Default for TitleStyle {
    fn default() -> Self {
        Self {
            font_family: default_font_family(),
            font_size: default_title_font_size(),
            color: default_text_color(),
            bold: false,
            stroke_color: None,
            stroke_width: 0,
        }
    }
}

fn default_font_family() -> String {
    "Arial".to_string()
}

fn default_title_font_size() -> f64 {
    72.0
}

fn default_text_color() -> String {
    "#FFFFFF".to_string()
}

/// Symbolic transition between adjacent clips.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransitionConfig {
    /// Transition name; unknown names degrade to a fade
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default = "default_transition_duration")]
    pub duration: f64,
}

fn default_transition_duration() -> f64 {
    DEFAULT_TRANSITION_DURATION
}

/// Corner (or top-band center) where ranking badges are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum RankingPosition {
    #[default]
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    Center,
}

impl RankingPosition {
    pub fn as_str(&self) -> &'static str {
        match self {
            RankingPosition::TopLeft => "top-left",
            RankingPosition::TopRight => "top-right",
            RankingPosition::BottomLeft => "bottom-left",
            RankingPosition::BottomRight => "bottom-right",
            RankingPosition::Center => "center",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RankingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub position: RankingPosition,
    /// Badge edge length at the 1080px reference width
    #[serde(default = "default_badge_size")]
    pub size: f64,
    #[serde(default = "default_badge_color")]
    pub color: String,
    #[serde(default = "default_text_color")]
    pub text_color: String,
    /// Number clips N..1 instead of 1..N
    #[serde(default)]
    pub countdown: bool,
}

fn default_true() -> bool {
    true
}

fn default_badge_size() -> f64 {
    80.0
}

fn default_badge_color() -> String {
    "#FF3B30".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CaptionPosition {
    Top,
    Middle,
    #[default]
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum CaptionAnimation {
    #[default]
    None,
    Fade,
    SlideUp,
}

/// Caption shown for the whole window of one clip.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CaptionSpec {
    pub clip_index: usize,
    pub text: String,
    #[serde(default)]
    pub position: CaptionPosition,
    #[serde(default)]
    pub animation: CaptionAnimation,
    #[serde(default = "default_caption_font_size")]
    pub font_size: f64,
    #[serde(default = "default_text_color")]
    pub color: String,
    #[serde(default = "default_caption_box")]
    pub background_color: String,
}

fn default_caption_font_size() -> f64 {
    48.0
}

fn default_caption_box() -> String {
    "#000000".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum OverlayKind {
    Text,
    Watermark,
    LowerThird,
    ProgressBar,
}

/// Free-standing decoration with its own time box.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OverlaySpec {
    pub kind: OverlayKind,
    #[serde(default)]
    pub text: String,
    /// Defaults to the composition start
    #[serde(default)]
    pub start: Option<f64>,
    /// Defaults to the composition end
    #[serde(default)]
    pub end: Option<f64>,
    #[serde(default)]
    pub position: Option<RelativePosition>,
    #[serde(default = "default_caption_font_size")]
    pub font_size: f64,
    #[serde(default = "default_text_color")]
    pub color: String,
    #[serde(default = "default_overlay_accent")]
    pub background_color: String,
}

fn default_overlay_accent() -> String {
    "#1E88E5".to_string()
}

/// Background music settings.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AudioConfig {
    pub source: PathBuf,
    #[serde(default = "default_volume")]
    pub volume: f64,
    #[serde(default)]
    pub fade_in: bool,
    #[serde(default)]
    pub fade_out: bool,
}

fn default_volume() -> f64 {
    1.0
}
fn check_color(field: &str, value: &str) -> Result<(), String> {
    if is_hex_color(value) {
        Ok(())
    } else {
        Err(format!("{} must be #RRGGBB, got {:?}", field, value))
    }
}

fn check_font_size(owner: &str, size: f64) -> Result<(), String> {
    if size.is_finite() && size > 0.0 {
        Ok(())
    } else {
        Err(format!("{} font size must be positive, got {}", owner, size))
    }
}

/// Whether `value` is a `#RRGGBB` color.
pub fn is_hex_color(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit())
}
