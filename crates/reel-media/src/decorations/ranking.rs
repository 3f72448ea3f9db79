//! Ranking badges: a coloured square and an ordinal per clip.

use reel_models::RankingConfig;

use super::{drawtext, passthrough, window_gate, DecorationContext, DEFAULT_FONT_FAMILY};
use crate::error::MediaResult;
use crate::escape::ffmpeg_color;
use crate::geometry::{preview_round, ranking_position, BadgePlacement};
use crate::graph::{Filter, FilterStage, Fragment};
use crate::labels::{LabelAllocator, StreamKind, StreamLabel};
use crate::timeline::ClipWindow;

/// Ordinal font size relative to the badge edge.
const NUMBER_SCALE: f64 = 0.6;

/// One stage per clip, each gated to that clip's timeline window.
pub fn build_ranking(
    ctx: &DecorationContext<'_>,
    ranking: Option<&RankingConfig>,
    input: StreamLabel,
    labels: &mut LabelAllocator,
) -> MediaResult<Fragment> {
    let config = match ranking {
        Some(r) if r.enabled => r,
        _ => return Ok(passthrough(input)),
    };

    let badge = ranking_position(config.position, config.size, ctx.width, ctx.height);
    let count = ctx.timeline.len();
    let mut fragment = passthrough(input);

    for (i, window) in ctx.timeline.windows().iter().enumerate() {
        let ordinal = if config.countdown { count - i } else { i + 1 };
        let output = labels.allocate(StreamKind::Rank, i);
        let filters = badge_filters(ctx, config, badge, ordinal, *window)?;
        fragment
            .stages
            .push(FilterStage::chain(fragment.output, filters, output.clone()));
        fragment.output = output;
    }

    Ok(fragment)
}

fn badge_filters(
    ctx: &DecorationContext<'_>,
    config: &RankingConfig,
    badge: BadgePlacement,
    ordinal: usize,
    window: ClipWindow,
) -> MediaResult<Vec<Filter>> {
    let gate = window_gate(window);

    let square = Filter::new("drawbox")
        .arg("x", badge.x)
        .arg("y", badge.y)
        .arg("w", badge.size)
        .arg("h", badge.size)
        .arg("color", ffmpeg_color(&config.color)?)
        .arg("t", "fill")
        .arg("enable", gate.clone());

    let number = ctx
        .with_font(drawtext(&ordinal.to_string()), DEFAULT_FONT_FAMILY, true)
        .arg("fontsize", preview_round(badge.size as f64 * NUMBER_SCALE))
        .arg("fontcolor", ffmpeg_color(&config.text_color)?)
        .arg("x", format!("{}+({}-text_w)/2", badge.x, badge.size))
        .arg("y", format!("{}+({}-text_h)/2", badge.y, badge.size))
        .arg("enable", gate);

    Ok(vec![square, number])
}
