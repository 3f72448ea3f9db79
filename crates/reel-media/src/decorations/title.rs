//! Composition title.

use reel_models::TitleSpec;

use super::{drawtext, passthrough, DecorationContext};
use crate::error::MediaResult;
use crate::escape::{escape_title, ffmpeg_color};
use crate::geometry::title_position;
use crate::graph::{FilterStage, Fragment};
use crate::labels::{LabelAllocator, StreamKind, StreamLabel};

/// Draw the title for the whole composition.
pub fn build_title(
    ctx: &DecorationContext<'_>,
    title: Option<&TitleSpec>,
    input: StreamLabel,
    labels: &mut LabelAllocator,
) -> MediaResult<Fragment> {
    let title = match title {
        Some(t) if !t.text.trim().is_empty() => t,
        _ => return Ok(passthrough(input)),
    };

    let style = &title.style;
    let placement = title_position(title.position, style.font_size, ctx.width, ctx.height);

    let mut filter = ctx
        .with_font(drawtext(&escape_title(&title.text)), &style.font_family, style.bold)
        .arg("fontsize", placement.font_size)
        .arg("fontcolor", ffmpeg_color(&style.color)?)
        .arg("x", placement.x_expr)
        .arg("y", placement.abs_y);

    if let (Some(stroke), true) = (&style.stroke_color, style.stroke_width > 0) {
        filter = filter
            .arg("borderw", style.stroke_width)
            .arg("bordercolor", ffmpeg_color(stroke)?);
    }

    let output = labels.allocate_named(StreamKind::Title);
    Ok(Fragment::single(FilterStage::chain(input, vec![filter], output.clone()), output))
}
