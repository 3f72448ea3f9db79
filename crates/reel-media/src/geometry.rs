//! Pixel geometry shared with the editor's live preview.
//!
//! These formulas must produce exactly the numbers the preview renderer
//! computes, so the exported video matches what the user approved.

use reel_models::{CaptionPosition, RankingPosition, RelativePosition};

/// Output width the preview's sizes are authored against (1080p tier).
pub const REFERENCE_WIDTH: f64 = 1080.0;
/// Preview DOM zoom applied to title text.
pub const PREVIEW_TEXT_ZOOM: f64 = 0.6;
/// Share of the frame height, from the top, that hosts ranking badges.
pub const RANKING_BAND: f64 = 0.3;

/// Round half up, matching the preview's `Math.round`.
pub fn preview_round(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

/// Scale a length authored at the reference width to `width`.
pub fn scale_to_width(value: f64, width: u32) -> i64 {
    preview_round(value * width as f64 / REFERENCE_WIDTH)
}

/// Resolved title placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitlePlacement {
    pub abs_x: i64,
    pub abs_y: i64,
    pub font_size: i64,
    /// Horizontal expression centring the text on `abs_x`; text width is
    /// resolved by the engine at render time.
    pub x_expr: String,
}

/// Title anchor: horizontally centred on `x%`, top edge at `y%`.
pub fn title_position(
    position: RelativePosition,
    base_font_size: f64,
    width: u32,
    height: u32,
) -> TitlePlacement {
    let abs_x = preview_round(position.x / 100.0 * width as f64);
    let abs_y = preview_round(position.y / 100.0 * height as f64);
    let font_size =
        preview_round(base_font_size * (width as f64 / REFERENCE_WIDTH) * PREVIEW_TEXT_ZOOM);

    TitlePlacement {
        abs_x,
        abs_y,
        font_size,
        x_expr: format!("({}-text_w/2)", abs_x),
    }
}

/// Resolved ranking badge box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BadgePlacement {
    pub x: i64,
    pub y: i64,
    pub size: i64,
    pub padding: i64,
}

/// Badge placement for a nominal corner.
///
/// Bottom corners live in the top band of the frame, and `center` is centred
/// within that band rather than the whole canvas.
pub fn ranking_position(
    position: RankingPosition,
    base_size: f64,
    width: u32,
    height: u32,
) -> BadgePlacement {
    let size = scale_to_width(base_size, width);
    let padding = preview_round(size as f64 * 0.2);
    let band = RANKING_BAND * height as f64;
    let w = width as i64;

    let right_x = w - size - padding;
    let band_y = preview_round((padding as f64 + size as f64 * 0.5).min(band - size as f64));

    let (x, y) = match position {
        RankingPosition::TopLeft => (padding, padding),
        RankingPosition::TopRight => (right_x, padding),
        RankingPosition::BottomLeft => (padding, band_y),
        RankingPosition::BottomRight => (right_x, band_y),
        RankingPosition::Center => (
            preview_round((w - size) as f64 / 2.0),
            preview_round((band - size as f64) / 2.0),
        ),
    };

    BadgePlacement { x, y, size, padding }
}

/// Vertical band occupied by the clips, anchored at the bottom of the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoArea {
    pub y: u32,
    pub height: u32,
}

/// Band for `height_fraction` of a frame `height` pixels tall.
pub fn video_area(height_fraction: f64, height: u32) -> VideoArea {
    let area = preview_round(height_fraction * height as f64).clamp(1, height as i64) as u32;
    VideoArea {
        y: height - area,
        height: area,
    }
}

/// Caption text top edge for a position keyword.
pub fn caption_y(position: CaptionPosition, height: u32) -> i64 {
    let fraction = match position {
        CaptionPosition::Top => 0.1,
        CaptionPosition::Middle => 0.5,
        CaptionPosition::Bottom => 0.85,
    };
    preview_round(fraction * height as f64)
}

/// Absolute point for a percentage position.
pub fn absolute_point(position: RelativePosition, width: u32, height: u32) -> (i64, i64) {
    (
        preview_round(position.x / 100.0 * width as f64),
        preview_round(position.y / 100.0 * height as f64),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_golden_title_position() {
        let placement = title_position(RelativePosition { x: 50.0, y: 10.0 }, 24.0, 1080, 1920);
        assert_eq!(
            placement,
            TitlePlacement {
                abs_x: 540,
                abs_y: 192,
                font_size: 14,
                x_expr: "(540-text_w/2)".to_string(),
            }
        );
    }

    #[test]
    fn test_golden_ranking_bottom_right() {
        let badge = ranking_position(RankingPosition::BottomRight, 80.0, 1080, 1920);
        assert_eq!(badge, BadgePlacement { x: 984, y: 56, size: 80, padding: 16 });
    }

    #[test]
    fn test_ranking_corners() {
        let tl = ranking_position(RankingPosition::TopLeft, 80.0, 1080, 1920);
        assert_eq!((tl.x, tl.y), (16, 16));

        let tr = ranking_position(RankingPosition::TopRight, 80.0, 1080, 1920);
        assert_eq!((tr.x, tr.y), (984, 16));

        let bl = ranking_position(RankingPosition::BottomLeft, 80.0, 1080, 1920);
        assert_eq!((bl.x, bl.y), (16, 56));

        // Centred in the top 30% band (576px), not the full 1920px frame.
        let c = ranking_position(RankingPosition::Center, 80.0, 1080, 1920);
        assert_eq!((c.x, c.y), (500, 248));
    }

    #[test]
    fn test_ranking_band_limit_on_tiny_frames() {
        // Band of 60px cannot fit padding + half a badge; the band cap wins.
        let badge = ranking_position(RankingPosition::BottomLeft, 80.0, 1080, 200);
        assert_eq!(badge.y, -20);
    }

    #[test]
    fn test_title_scales_with_tier() {
        let p = title_position(RelativePosition { x: 50.0, y: 10.0 }, 24.0, 720, 1280);
        assert_eq!((p.abs_x, p.abs_y, p.font_size), (360, 128, 10));

        let p = title_position(RelativePosition { x: 50.0, y: 10.0 }, 24.0, 2160, 3840);
        assert_eq!((p.abs_x, p.abs_y, p.font_size), (1080, 384, 29));
    }

    #[test]
    fn test_video_area() {
        assert_eq!(video_area(0.7, 1920), VideoArea { y: 576, height: 1344 });
        assert_eq!(video_area(1.0, 1920), VideoArea { y: 0, height: 1920 });
    }

    #[test]
    fn test_caption_rows() {
        assert_eq!(caption_y(CaptionPosition::Top, 1920), 192);
        assert_eq!(caption_y(CaptionPosition::Middle, 1920), 960);
        assert_eq!(caption_y(CaptionPosition::Bottom, 1920), 1632);
    }

    #[test]
    fn test_preview_round_half_up() {
        assert_eq!(preview_round(2.5), 3);
        assert_eq!(preview_round(-2.5), -2);
        assert_eq!(preview_round(14.4), 14);
    }
}
