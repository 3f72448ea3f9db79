//! Free overlays with their own time boxes.

use reel_models::{OverlayKind, OverlaySpec, RelativePosition};

use super::{drawtext, passthrough, window_gate, DecorationContext, DEFAULT_FONT_FAMILY};
use crate::error::MediaResult;
use crate::escape::{escape_text, ffmpeg_color, ffmpeg_color_alpha, quoted};
use crate::geometry::{absolute_point, preview_round, scale_to_width};
use crate::graph::{num, Filter, FilterStage, Fragment};
use crate::labels::{LabelAllocator, StreamKind, StreamLabel};
use crate::timeline::ClipWindow;

/// Watermark offset from the bottom-right corner, in pixels.
const WATERMARK_OFFSET: u32 = 20;
const WATERMARK_OPACITY: f64 = 0.7;
/// Text used when a watermark has none.
const WATERMARK_PLACEHOLDER: &str = "LOGO";

/// Lower-third bar top edge and height as shares of the frame height.
const LOWER_THIRD_TOP: f64 = 0.78;
const LOWER_THIRD_HEIGHT: f64 = 0.1;
const LOWER_THIRD_OPACITY: f64 = 0.85;
/// Left inset of lower-third text at the reference width.
const LOWER_THIRD_INSET: f64 = 40.0;

/// Progress bar thickness at the reference width.
const PROGRESS_BAR_HEIGHT: f64 = 12.0;

/// Draw every overlay in list order on top of `input`.
pub fn build_overlays(
    ctx: &DecorationContext<'_>,
    overlays: &[OverlaySpec],
    input: StreamLabel,
    labels: &mut LabelAllocator,
) -> MediaResult<Fragment> {
    let mut fragment = passthrough(input);

    for (i, overlay) in overlays.iter().enumerate() {
        let window = overlay_window(ctx, overlay);
        let output = labels.allocate(StreamKind::Overlay, i);

        match overlay.kind {
            OverlayKind::ProgressBar => {
                let source = labels.allocate(StreamKind::OverlaySource, i);
                let (bar, overlay_stage) =
                    progress_bar(ctx, overlay, fragment.output, source, output.clone())?;
                fragment.stages.push(bar);
                fragment.stages.push(overlay_stage);
            }
            kind => {
                let filters = match kind {
                    OverlayKind::Text => vec![text_filter(ctx, overlay, window)?],
                    OverlayKind::Watermark => vec![watermark_filter(ctx, overlay, window)?],
                    _ => lower_third_filters(ctx, overlay, window)?,
                };
                fragment
                    .stages
                    .push(FilterStage::chain(fragment.output, filters, output.clone()));
            }
        }

        fragment.output = output;
    }

    Ok(fragment)
}

/// Explicit `[start, end)` or the whole composition.
fn overlay_window(ctx: &DecorationContext<'_>, overlay: &OverlaySpec) -> ClipWindow {
    ClipWindow {
        start: overlay.start.unwrap_or(0.0).max(0.0),
        end: overlay.end.unwrap_or_else(|| ctx.total_duration()),
    }
}

fn styled_text(ctx: &DecorationContext<'_>, text: &str, overlay: &OverlaySpec) -> Filter {
    ctx.with_font(drawtext(&escape_text(text)), DEFAULT_FONT_FAMILY, false)
        .arg("fontsize", scale_to_width(overlay.font_size, ctx.width))
}

fn text_filter(
    ctx: &DecorationContext<'_>,
    overlay: &OverlaySpec,
    window: ClipWindow,
) -> MediaResult<Filter> {
    let position = overlay.position.unwrap_or(RelativePosition { x: 50.0, y: 50.0 });
    let (x, y) = absolute_point(position, ctx.width, ctx.height);

    Ok(styled_text(ctx, &overlay.text, overlay)
        .arg("fontcolor", ffmpeg_color(&overlay.color)?)
        .arg("x", format!("({}-text_w/2)", x))
        .arg("y", y)
        .arg("enable", window_gate(window)))
}

fn watermark_filter(
    ctx: &DecorationContext<'_>,
    overlay: &OverlaySpec,
    window: ClipWindow,
) -> MediaResult<Filter> {
    let text = if overlay.text.trim().is_empty() {
        WATERMARK_PLACEHOLDER
    } else {
        overlay.text.as_str()
    };

    Ok(styled_text(ctx, text, overlay)
        .arg("fontcolor", ffmpeg_color_alpha(&overlay.color, WATERMARK_OPACITY)?)
        .arg("x", format!("w-text_w-{}", WATERMARK_OFFSET))
        .arg("y", format!("h-text_h-{}", WATERMARK_OFFSET))
        .arg("enable", window_gate(window)))
}

fn lower_third_filters(
    ctx: &DecorationContext<'_>,
    overlay: &OverlaySpec,
    window: ClipWindow,
) -> MediaResult<Vec<Filter>> {
    let height = ctx.height as f64;
    let bar_y = preview_round(LOWER_THIRD_TOP * height);
    let bar_h = preview_round(LOWER_THIRD_HEIGHT * height);

    let bar = Filter::new("drawbox")
        .arg("x", 0)
        .arg("y", bar_y)
        .arg("w", "iw")
        .arg("h", bar_h)
        .arg("color", ffmpeg_color_alpha(&overlay.background_color, LOWER_THIRD_OPACITY)?)
        .arg("t", "fill")
        .arg("enable", window_gate(window));

    let text = styled_text(ctx, &overlay.text, overlay)
        .arg("fontcolor", ffmpeg_color(&overlay.color)?)
        .arg("x", scale_to_width(LOWER_THIRD_INSET, ctx.width))
        .arg("y", format!("{}+({}-text_h)/2", bar_y, bar_h))
        .arg("enable", window_gate(window));

    Ok(vec![bar, text])
}

/// Solid bar source plus an overlay sliding it in over the whole composition.
fn progress_bar(
    ctx: &DecorationContext<'_>,
    overlay: &OverlaySpec,
    input: StreamLabel,
    source: StreamLabel,
    output: StreamLabel,
) -> MediaResult<(FilterStage, FilterStage)> {
    let total = ctx.total_duration();
    let bar_h = scale_to_width(PROGRESS_BAR_HEIGHT, ctx.width).max(1);

    let bar = FilterStage::source(
        Filter::new("color")
            .arg("c", ffmpeg_color(&overlay.background_color)?)
            .arg("s", format!("{}x{}", ctx.width, bar_h))
            .arg("r", reel_models::quality::OUTPUT_FRAME_RATE)
            .arg("d", num(total)),
        source.clone(),
    );

    let slide = FilterStage::new(
        vec![input, source],
        vec![Filter::new("overlay")
            .arg("x", quoted(&format!("-w+W*min(t/{},1)", num(total))))
            .arg("y", "H-h")],
        vec![output],
    );

    Ok((bar, slide))
}
