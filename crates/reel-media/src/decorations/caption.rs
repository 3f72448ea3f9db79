//! Per-clip captions.

use reel_models::{CaptionAnimation, CaptionSpec};

use super::{drawtext, passthrough, window_gate, DecorationContext, DEFAULT_FONT_FAMILY};
use crate::error::{MediaError, MediaResult};
use crate::escape::{escape_text, ffmpeg_color, ffmpeg_color_alpha, quoted};
use crate::geometry::{caption_y, scale_to_width};
use crate::graph::{num, Filter, FilterStage, Fragment};
use crate::labels::{LabelAllocator, StreamKind, StreamLabel};
use crate::timeline::ClipWindow;

/// Box padding around caption text, in pixels.
const BOX_PADDING: u32 = 20;
/// Length of the fade and slide ramps.
const RAMP_SECS: f64 = 0.5;
/// Slide-up travel at the reference width.
const SLIDE_DISTANCE: f64 = 50.0;
const BOX_OPACITY: f64 = 0.6;

/// One `drawtext` stage per caption, each gated to its clip's window.
pub fn build_captions(
    ctx: &DecorationContext<'_>,
    captions: &[CaptionSpec],
    input: StreamLabel,
    labels: &mut LabelAllocator,
) -> MediaResult<Fragment> {
    let mut fragment = passthrough(input);

    for (i, caption) in captions.iter().enumerate() {
        let window = ctx.timeline.window(caption.clip_index).ok_or_else(|| {
            MediaError::invalid_composition(format!(
                "Caption {} references missing clip {}",
                i, caption.clip_index
            ))
        })?;

        let output = labels.allocate(StreamKind::Caption, i);
        let filter = caption_filter(ctx, caption, window)?;
        fragment
            .stages
            .push(FilterStage::chain(fragment.output, vec![filter], output.clone()));
        fragment.output = output;
    }

    Ok(fragment)
}

fn caption_filter(
    ctx: &DecorationContext<'_>,
    caption: &CaptionSpec,
    window: ClipWindow,
) -> MediaResult<Filter> {
    let y = caption_y(caption.position, ctx.height);
    let start = num(window.start);

    let y_expr = match caption.animation {
        CaptionAnimation::SlideUp => {
            let travel = scale_to_width(SLIDE_DISTANCE, ctx.width);
            quoted(&format!(
                "if(lt(t,{s}+{r}),{y}+{d}*(1-(t-{s})/{r}),{y})",
                s = start,
                r = num(RAMP_SECS),
                y = y,
                d = travel
            ))
        }
        _ => y.to_string(),
    };

    let filter = drawtext(&escape_text(&caption.text));
    let mut filter = ctx
        .with_font(filter, DEFAULT_FONT_FAMILY, false)
        .arg("fontsize", scale_to_width(caption.font_size, ctx.width))
        .arg("fontcolor", ffmpeg_color(&caption.color)?)
        .arg("x", "(w-text_w)/2")
        .arg("y", y_expr)
        .arg("box", 1)
        .arg("boxcolor", ffmpeg_color_alpha(&caption.background_color, BOX_OPACITY)?)
        .arg("boxborderw", BOX_PADDING);

    if caption.animation == CaptionAnimation::Fade {
        filter = filter.arg(
            "alpha",
            quoted(&format!(
                "if(lt(t,{s}+{r}),(t-{s})/{r},if(gt(t,{e}-{r}),({e}-t)/{r},1))",
                s = start,
                e = num(window.end),
                r = num(RAMP_SECS)
            )),
        );
    }

    Ok(filter.arg("enable", window_gate(window)))
}
