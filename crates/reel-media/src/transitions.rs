//! Transition resolution between adjacent clips.
//!
//! A symbolic transition name resolves to one of three shapes:
//! a hard cut (`concat`), a native `xfade` primitive, or a custom effect that
//! transforms the trailing edge of the left stream and the leading edge of
//! the right stream before blending them with `xfade=fade`.

use tracing::debug;

use reel_models::TransitionConfig;

use crate::graph::{num, Filter, FilterStage, Fragment};
use crate::labels::{LabelAllocator, StreamKind, StreamLabel};

/// Longest transition accepted, in seconds.
pub const MAX_TRANSITION_SECS: f64 = 2.0;

/// Native `xfade` transitions accepted by name.
const NATIVE_XFADE: &[&str] = &[
    "fade",
    "fadeblack",
    "fadewhite",
    "fadegrays",
    "dissolve",
    "wipeleft",
    "wiperight",
    "wipeup",
    "wipedown",
    "slideleft",
    "slideright",
    "slideup",
    "slidedown",
    "smoothleft",
    "smoothright",
    "smoothup",
    "smoothdown",
    "circleopen",
    "circleclose",
    "circlecrop",
    "rectcrop",
    "radial",
    "pixelize",
    "distance",
    "diagtl",
    "diagtr",
    "hblur",
    "zoomin",
    "squeezeh",
    "squeezev",
];

/// Per-frame effect without a native `xfade` equivalent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomEffect {
    /// Half-turn rotation out of the left clip and into the right clip
    Spin,
    /// Brightness ramps to white at the boundary and back
    Flash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    Cut,
    Native(&'static str),
    Custom(CustomEffect),
}

impl TransitionKind {
    /// Resolve a symbolic name. Unknown names degrade to a fade.
    pub fn parse(name: &str) -> Self {
        let normalized = name.trim().to_ascii_lowercase().replace(['-', '_', ' '], "");
        match normalized.as_str() {
            "none" | "cut" => TransitionKind::Cut,
            "crossfade" => TransitionKind::Native("fade"),
            "wipe" => TransitionKind::Native("wipeleft"),
            "slide" => TransitionKind::Native("slideleft"),
            "zoom" => TransitionKind::Native("zoomin"),
            "spin" => TransitionKind::Custom(CustomEffect::Spin),
            "flash" => TransitionKind::Custom(CustomEffect::Flash),
            other => match NATIVE_XFADE.iter().find(|n| **n == other) {
                Some(native) => TransitionKind::Native(native),
                None => {
                    debug!(transition = name, "Unknown transition, using fade");
                    TransitionKind::Native("fade")
                }
            },
        }
    }

    /// Kind for an optional config; absence means a hard cut.
    pub fn from_config(config: Option<&TransitionConfig>) -> Self {
        config
            .map(|c| Self::parse(&c.kind))
            .unwrap_or(TransitionKind::Cut)
    }
}

/// Clamp a requested duration to `[0, 2]` and then to half the shorter
/// adjacent clip, so the blend offset can never go negative.
pub fn clamp_duration(requested: f64, left_clip: f64, right_clip: f64) -> f64 {
    let requested = if requested.is_finite() {
        requested.clamp(0.0, MAX_TRANSITION_SECS)
    } else {
        0.0
    };
    let limit = (left_clip.min(right_clip) / 2.0).max(0.0);
    requested.min(limit)
}

/// Join `left` and `right` at the boundary after a clip of length
/// `prev_clip_duration`.
///
/// `pair` is the zero-based boundary index and keys every label produced.
pub fn join_pair(
    kind: TransitionKind,
    duration: f64,
    left: StreamLabel,
    right: StreamLabel,
    prev_clip_duration: f64,
    pair: usize,
    labels: &mut LabelAllocator,
) -> Fragment {
    let output = labels.allocate(StreamKind::Join, pair);

    if kind == TransitionKind::Cut || duration <= 0.0 {
        let stage = FilterStage::new(vec![left, right], vec![concat(2)], vec![output.clone()]);
        return Fragment::single(stage, output);
    }

    let offset = prev_clip_duration - duration;

    match kind {
        TransitionKind::Native(name) => {
            let stage = FilterStage::new(
                vec![left, right],
                vec![xfade(name, duration, offset)],
                vec![output.clone()],
            );
            Fragment::single(stage, output)
        }
        TransitionKind::Custom(effect) => {
            let left_edge = labels.allocate(StreamKind::Transform, pair * 2);
            let right_edge = labels.allocate(StreamKind::Transform, pair * 2 + 1);
            let stages = vec![
                FilterStage::chain(left, vec![trailing_edge(effect, duration, offset)], left_edge.clone()),
                FilterStage::chain(right, vec![leading_edge(effect, duration)], right_edge.clone()),
                FilterStage::new(
                    vec![left_edge, right_edge],
                    vec![xfade("fade", duration, offset)],
                    vec![output.clone()],
                ),
            ];
            Fragment { stages, output }
        }
        TransitionKind::Cut => unreachable!("cut handled above"),
    }
}

/// `concat` of `n` video-only segments.
pub fn concat(n: usize) -> Filter {
    Filter::new("concat").arg("n", n).arg("v", 1).arg("a", 0)
}

fn xfade(name: &str, duration: f64, offset: f64) -> Filter {
    Filter::new("xfade")
        .arg("transition", name)
        .arg("duration", num(duration))
        .arg("offset", num(offset))
}

/// Transform over `[offset, offset+d)` of the left stream; progress runs 0→1.
fn trailing_edge(effect: CustomEffect, duration: f64, offset: f64) -> Filter {
    let progress = format!("(t-{})/{}", num(offset), num(duration));
    let gate = format!("gte(t,{})", num(offset));
    effect_filter(effect, &gate, &progress)
}

/// Transform over `[0, d)` of the right stream; progress runs 1→0.
fn leading_edge(effect: CustomEffect, duration: f64) -> Filter {
    let progress = format!("({}-t)/{}", num(duration), num(duration));
    let gate = format!("lt(t,{})", num(duration));
    effect_filter(effect, &gate, &progress)
}

fn effect_filter(effect: CustomEffect, gate: &str, progress: &str) -> Filter {
    match effect {
        CustomEffect::Spin => Filter::new("rotate")
            .arg("a", format!("'if({},PI*{},0)'", gate, progress))
            .arg("fillcolor", "black"),
        CustomEffect::Flash => Filter::new("eq")
            .arg("brightness", format!("'if({},{},0)'", gate, progress))
            .arg("eval", "frame"),
    }
}
