//! Composition compiler.
//!
//! Turns a [`CompositionSpec`] into a [`CompiledProgram`] in a fixed order:
//!
//! 1. per clip: trim, fit into the video area, composite onto a canvas
//! 2. join clips (concat, or a left fold of transitions)
//! 3. captions, free overlays, title, ranking badges
//! 4. background music (independent of the video chain)
//! 5. final pixel-format normalization
//!
//! The compiler alone tracks the "current" video stream; builders only see
//! the label they are handed and return the label they produced.

use std::sync::Arc;

use tracing::{debug, info};

use reel_models::quality::{OUTPUT_FRAME_RATE, OUTPUT_PIXEL_FORMAT};
use reel_models::{CompositionSpec, DualSourceSpec};

use crate::audio::{build_dual_audio, build_music, SourceAudio};
use crate::decorations::{build_captions, build_overlays, build_ranking, build_title, DecorationContext};
use crate::error::{MediaError, MediaResult};
use crate::escape::ffmpeg_color;
use crate::fonts::FontResolver;
use crate::geometry::video_area;
use crate::graph::{num, CompiledProgram, Filter, FilterStage, Fragment, InputFile};
use crate::labels::{LabelAllocator, StreamKind, StreamLabel};
use crate::timeline::ClipTimeline;
use crate::transitions::{clamp_duration, concat, join_pair, TransitionKind};

/// What the render job knows about one source of a two-source render.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceInfo {
    pub duration: f64,
    pub has_audio: bool,
}

/// Compiles composition requests into filter programs.
#[derive(Clone)]
pub struct CompositionCompiler {
    fonts: Arc<dyn FontResolver>,
}

impl CompositionCompiler {
    /// Compiler resolving font families through `fonts`.
    pub fn new(fonts: Arc<dyn FontResolver>) -> Self {
        Self { fonts }
    }

    /// Compile a single-track composition.
    pub fn compile(&self, spec: &CompositionSpec) -> MediaResult<CompiledProgram> {
        spec.validate().map_err(MediaError::invalid_composition)?;

        let encoding = spec.quality.profile();
        let (width, height) = (encoding.width, encoding.height);
        let timeline = ClipTimeline::build(&spec.durations())?;
        let total_duration = timeline.total_duration();

        debug!(
            clips = spec.clips.len(),
            quality = %spec.quality,
            total_duration,
            "Compiling composition"
        );

        let mut labels = LabelAllocator::new();
        let mut stages = Vec::new();
        let mut inputs: Vec<InputFile> = spec.clips.iter().map(|c| InputFile::new(&c.source)).collect();

        let area = video_area(spec.video_height_fraction, height);
        let background = ffmpeg_color(&spec.background_color)?;
        let mut placed = Vec::with_capacity(spec.clips.len());

        for (i, clip) in spec.clips.iter().enumerate() {
            let clip_label = labels.allocate(StreamKind::Clip, i);
            let canvas_label = labels.allocate(StreamKind::Canvas, i);
            let placed_label = labels.allocate(StreamKind::Placed, i);

            let mut filters = vec![
                Filter::new("trim")
                    .arg("start", num(clip.trim_start))
                    .arg("duration", num(clip.duration)),
                Filter::new("setpts").positional("PTS-STARTPTS"),
            ];
            filters.extend(fit_filters(width, area.height, &background));
            stages.push(FilterStage::chain(StreamLabel::input_video(i), filters, clip_label.clone()));

            stages.push(FilterStage::source(
                Filter::new("color")
                    .arg("c", &background)
                    .arg("s", format!("{}x{}", width, height))
                    .arg("r", OUTPUT_FRAME_RATE)
                    .arg("d", num(clip.duration)),
                canvas_label.clone(),
            ));

            stages.push(FilterStage::new(
                vec![canvas_label, clip_label],
                vec![Filter::new("overlay")
                    .positional(0)
                    .positional(area.y)
                    .arg("shortest", 1)],
                vec![placed_label.clone()],
            ));

            placed.push(placed_label);
        }

        let joined = join_clips(spec, &timeline, placed, &mut labels)?;
        stages.extend(joined.stages);
        let mut current = joined.output;

        let ctx = DecorationContext {
            width,
            height,
            timeline: &timeline,
            fonts: self.fonts.as_ref(),
        };

        let captions = build_captions(&ctx, &spec.captions, current, &mut labels)?;
        current = absorb(&mut stages, captions);

        let overlays = build_overlays(&ctx, &spec.overlays, current, &mut labels)?;
        current = absorb(&mut stages, overlays);

        let title = build_title(&ctx, spec.title.as_ref(), current, &mut labels)?;
        current = absorb(&mut stages, title);

        let ranking = build_ranking(&ctx, spec.ranking.as_ref(), current, &mut labels)?;
        current = absorb(&mut stages, ranking);

        let audio_out = match &spec.audio {
            Some(audio) => {
                let track = build_music(audio, inputs.len(), total_duration, &mut labels);
                inputs.push(track.input);
                Some(absorb(&mut stages, track.fragment))
            }
            None => None,
        };

        let video_out = labels.allocate_named(StreamKind::VideoOut);
        stages.push(FilterStage::chain(current, vec![pixel_format()], video_out.clone()));

        let program = CompiledProgram {
            inputs,
            stages,
            video_out,
            audio_out,
            encoding,
            total_duration,
        };
        program.validate()?;

        info!(
            stages = program.stages.len(),
            inputs = program.inputs.len(),
            has_audio = program.audio_out.is_some(),
            "Composition compiled"
        );

        Ok(program)
    }

    /// Compile a two-source render: primary on top, secondary below.
    pub fn compile_dual(
        &self,
        spec: &DualSourceSpec,
        primary: SourceInfo,
        secondary: SourceInfo,
    ) -> MediaResult<CompiledProgram> {
        spec.validate().map_err(MediaError::invalid_composition)?;

        let total_duration = primary.duration.min(secondary.duration);
        if !total_duration.is_finite() || total_duration <= 0.0 {
            return Err(MediaError::invalid_composition(format!(
                "Sources must have a positive duration, got {} and {}",
                primary.duration, secondary.duration
            )));
        }

        let encoding = spec.quality.profile();
        let half = encoding.height / 2;
        let background = ffmpeg_color(&spec.background_color)?;

        debug!(quality = %spec.quality, total_duration, "Compiling two-source render");

        let mut labels = LabelAllocator::new();
        let mut stages = Vec::new();
        let mut sources = Vec::with_capacity(2);

        for index in 0..2 {
            let label = labels.allocate(StreamKind::Source, index);
            stages.push(FilterStage::chain(
                StreamLabel::input_video(index),
                fit_filters(encoding.width, half, &background),
                label.clone(),
            ));
            sources.push(label);
        }

        let stacked = labels.allocate_named(StreamKind::Stack);
        stages.push(FilterStage::new(
            sources,
            vec![Filter::new("vstack").arg("inputs", 2).arg("shortest", 1)],
            vec![stacked.clone()],
        ));

        let audio_out = build_dual_audio(
            SourceAudio {
                volume: spec.primary_volume,
                has_audio: primary.has_audio,
            },
            SourceAudio {
                volume: spec.secondary_volume,
                has_audio: secondary.has_audio,
            },
            &mut labels,
        )
        .map(|fragment| absorb(&mut stages, fragment));

        let video_out = labels.allocate_named(StreamKind::VideoOut);
        stages.push(FilterStage::chain(stacked, vec![pixel_format()], video_out.clone()));

        let program = CompiledProgram {
            inputs: spec.input_paths().into_iter().map(InputFile::new).collect(),
            stages,
            video_out,
            audio_out,
            encoding,
            total_duration,
        };
        program.validate()?;

        info!(
            stages = program.stages.len(),
            has_audio = program.audio_out.is_some(),
            "Two-source render compiled"
        );

        Ok(program)
    }
}

/// Join placed clips: one concat for hard cuts, a left fold otherwise.
fn join_clips(
    spec: &CompositionSpec,
    timeline: &ClipTimeline,
    placed: Vec<StreamLabel>,
    labels: &mut LabelAllocator,
) -> MediaResult<Fragment> {
    let kind = TransitionKind::from_config(spec.transition.as_ref());
    let mut placed = placed.into_iter();

    let first = placed
        .next()
        .ok_or_else(|| MediaError::invalid_composition("At least one clip is required"))?;

    if timeline.len() < 2 {
        return Ok(Fragment {
            stages: Vec::new(),
            output: first,
        });
    }

    if kind == TransitionKind::Cut {
        let output = labels.allocate(StreamKind::Join, 0);
        let mut all = vec![first];
        all.extend(placed);
        let stage = FilterStage::new(all, vec![concat(timeline.len())], vec![output.clone()]);
        return Ok(Fragment::single(stage, output));
    }

    let requested = spec.transition.as_ref().map(|t| t.duration).unwrap_or(0.0);
    let mut stages = Vec::new();
    let mut current = first;

    for (i, next) in placed.enumerate() {
        let left = timeline.duration(i).unwrap_or(0.0);
        let right = timeline.duration(i + 1).unwrap_or(0.0);
        let duration = clamp_duration(requested, left, right);
        if duration < requested {
            debug!(boundary = i, requested, duration, "Transition shortened to fit clips");
        }

        let fragment = join_pair(kind, duration, current, next, left, i, labels);
        current = absorb(&mut stages, fragment);
    }

    Ok(Fragment {
        stages,
        output: current,
    })
}

/// Scale down to fit `width`x`height`, letterbox, normalize SAR and rate.
fn fit_filters(width: u32, height: u32, background: &str) -> Vec<Filter> {
    vec![
        Filter::new("scale")
            .positional(width)
            .positional(height)
            .arg("force_original_aspect_ratio", "decrease"),
        Filter::new("pad")
            .positional(width)
            .positional(height)
            .positional("(ow-iw)/2")
            .positional("(oh-ih)/2")
            .arg("color", background),
        Filter::new("setsar").positional(1),
        Filter::new("fps").positional(OUTPUT_FRAME_RATE),
    ]
}

fn pixel_format() -> Filter {
    Filter::new("format").positional(OUTPUT_PIXEL_FORMAT)
}

/// Move a fragment's stages into `stages` and return its output label.
fn absorb(stages: &mut Vec<FilterStage>, fragment: Fragment) -> StreamLabel {
    stages.extend(fragment.stages);
    fragment.output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::{FontPlatform, FontconfigOnly, StaticFontTable};
    use reel_models::FailureKind;
    use std::collections::HashSet;

    fn compiler() -> CompositionCompiler {
        CompositionCompiler::new(Arc::new(FontconfigOnly))
    }

    fn spec(value: serde_json::Value) -> CompositionSpec {
        serde_json::from_value(value).unwrap()
    }

    fn clips(durations: &[f64]) -> serde_json::Value {
        serde_json::Value::Array(
            durations
                .iter()
                .enumerate()
                .map(|(i, d)| serde_json::json!({ "source": format!("/tmp/clip{}.mp4", i), "duration": d }))
                .collect(),
        )
    }

    fn full_spec() -> CompositionSpec {
        spec(serde_json::json!({
            "clips": clips(&[4.0, 3.0, 5.0]),
            "title": { "text": "Top 3: picks, ranked", "style": { "fontSize": 24 } },
            "transition": { "type": "slideleft", "duration": 0.75 },
            "ranking": { "position": "bottom-right", "countdown": true },
            "captions": [
                { "clipIndex": 0, "text": "first" },
                { "clipIndex": 0, "text": "first again", "position": "top" },
                { "clipIndex": 2, "text": "last", "animation": "fade" }
            ],
            "overlays": [
                { "kind": "text", "text": "hello", "start": 1.0, "end": 2.0 },
                { "kind": "progress-bar" },
                { "kind": "lower-third", "text": "Host" },
                { "kind": "watermark" }
            ],
            "audio": { "source": "/tmp/music.mp3", "volume": 0.5, "fadeIn": true, "fadeOut": true }
        }))
    }

    #[test]
    fn test_two_clip_concat_structure() {
        let program = compiler()
            .compile(&spec(serde_json::json!({ "clips": clips(&[5.0, 5.0]) })))
            .unwrap();

        let concats = program.stages_using("concat");
        assert_eq!(concats.len(), 1);
        assert_eq!(concats[0].render(), "[placed0][placed1]concat=n=2:v=1:a=0[xf0]");
        assert_eq!(program.stages_using("format").len(), 1);
        assert!(program.stages_using("xfade").is_empty());
        assert_eq!(program.audio_out, None);
        assert_eq!(program.total_duration, 10.0);
        assert_eq!(program.inputs.len(), 2);
    }

    #[test]
    fn test_per_clip_stages() {
        let program = compiler()
            .compile(&spec(serde_json::json!({
                "clips": [{ "source": "/tmp/a.mp4", "trimStart": 2.5, "duration": 5.0 }]
            })))
            .unwrap();

        let graph = program.filter_graph();
        assert!(graph.starts_with(
            "[0:v]trim=start=2.5:duration=5,setpts=PTS-STARTPTS,\
             scale=1080:1344:force_original_aspect_ratio=decrease,\
             pad=1080:1344:(ow-iw)/2:(oh-ih)/2:color=0x000000,setsar=1,fps=30[clip0];\
             color=c=0x000000:s=1080x1920:r=30:d=5[canvas0];\
             [canvas0][clip0]overlay=0:576:shortest=1[placed0];"
        ));
        assert!(graph.ends_with("[placed0]format=yuv420p[vout]"));
        assert!(program.stages_using("concat").is_empty());
    }

    #[test]
    fn test_fade_fold_offsets() {
        let program = compiler()
            .compile(&spec(serde_json::json!({
                "clips": clips(&[4.0, 6.0, 3.0]),
                "transition": { "type": "fade", "duration": 0.5 }
            })))
            .unwrap();

        let folds = program.stages_using("xfade");
        assert_eq!(folds.len(), 2);
        let offsets: Vec<_> = folds
            .iter()
            .map(|s| s.filter("xfade").unwrap().param("offset").unwrap().to_string())
            .collect();
        assert_eq!(offsets, vec!["3.5", "5.5"]);
        assert_eq!(folds[1].inputs[0].as_str(), "xf0");
        assert!(program.stages_using("concat").is_empty());
    }

    #[test]
    fn test_unknown_transition_matches_fade() {
        let with = |kind: &str| {
            compiler()
                .compile(&spec(serde_json::json!({
                    "clips": clips(&[3.0, 3.0, 3.0]),
                    "transition": { "type": kind, "duration": 0.8 }
                })))
                .unwrap()
                .filter_graph()
        };
        assert_eq!(with("definitely-not-a-transition"), with("fade"));
    }

    #[test]
    fn test_short_clip_clamps_transition() {
        let program = compiler()
            .compile(&spec(serde_json::json!({
                "clips": clips(&[5.0, 0.6]),
                "transition": { "type": "fade", "duration": 2.0 }
            })))
            .unwrap();

        let xfade = program.stages_using("xfade")[0].filter("xfade").unwrap().clone();
        assert_eq!(xfade.param("duration"), Some("0.3"));
        assert_eq!(xfade.param("offset"), Some("4.7"));
    }

    #[test]
    fn test_none_transition_is_single_concat() {
        let program = compiler()
            .compile(&spec(serde_json::json!({
                "clips": clips(&[1.0, 2.0, 3.0]),
                "transition": { "type": "none" }
            })))
            .unwrap();
        let concats = program.stages_using("concat");
        assert_eq!(concats.len(), 1);
        assert_eq!(concats[0].inputs.len(), 3);
    }

    #[test]
    fn test_custom_transition_compiles() {
        let program = compiler()
            .compile(&spec(serde_json::json!({
                "clips": clips(&[2.0, 2.0]),
                "transition": { "type": "spin", "duration": 0.5 }
            })))
            .unwrap();
        assert_eq!(program.stages_using("rotate").len(), 2);
        assert_eq!(program.stages_using("xfade").len(), 1);
    }

    #[test]
    fn test_compilation_is_deterministic() {
        let compiler = CompositionCompiler::new(Arc::new(StaticFontTable::for_platform(FontPlatform::Linux)));
        let a = compiler.compile(&full_spec()).unwrap();
        let b = compiler.compile(&full_spec()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.filter_graph(), b.filter_graph());
    }

    #[test]
    fn test_output_labels_unique_and_ordered() {
        let program = compiler().compile(&full_spec()).unwrap();
        program.validate().unwrap();

        let mut seen = HashSet::new();
        for stage in &program.stages {
            for input in stage.inputs.iter().filter(|l| !l.is_input_pad()) {
                assert!(seen.contains(input), "{} used before produced", input);
            }
            for output in &stage.outputs {
                assert!(seen.insert(output.clone()), "{} produced twice", output);
            }
        }
    }

    #[test]
    fn test_decoration_order() {
        let program = compiler().compile(&full_spec()).unwrap();
        let position = |prefix: &str| {
            program
                .stages
                .iter()
                .position(|s| s.outputs.iter().any(|o| o.as_str().starts_with(prefix)))
                .unwrap()
        };
        assert!(position("xf") < position("cap"));
        assert!(position("cap") < position("ovl"));
        assert!(position("ovl") < position("title"));
        assert!(position("title") < position("rank"));
        assert_eq!(program.stages.last().unwrap().outputs[0].as_str(), "vout");
    }

    #[test]
    fn test_caption_and_ranking_windows_agree() {
        let program = compiler().compile(&full_spec()).unwrap();

        let caption_gate = program
            .stages
            .iter()
            .find(|s| s.outputs[0].as_str() == "cap2")
            .and_then(|s| s.filter("drawtext"))
            .and_then(|f| f.param("enable"))
            .unwrap()
            .to_string();
        let ranking_gate = program
            .stages
            .iter()
            .find(|s| s.outputs[0].as_str() == "rank2")
            .and_then(|s| s.filter("drawbox"))
            .and_then(|f| f.param("enable"))
            .unwrap()
            .to_string();

        assert_eq!(caption_gate, "'gte(t,7)*lt(t,12)'");
        assert_eq!(caption_gate, ranking_gate);
    }

    #[test]
    fn test_music_input_and_output() {
        let program = compiler().compile(&full_spec()).unwrap();
        assert_eq!(program.inputs.len(), 4);
        assert_eq!(program.inputs[3].options, vec!["-stream_loop", "-1"]);
        assert_eq!(program.audio_out.as_ref().map(|l| l.as_str()), Some("aout"));
        assert!(program.filter_graph().contains("[3:a]volume=0.5"));
        // Clip audio is never part of the graph.
        assert!(!program.filter_graph().contains("[0:a]"));
    }

    #[test]
    fn test_invalid_spec_is_rejected() {
        let err = compiler()
            .compile(&spec(serde_json::json!({ "clips": [] })))
            .unwrap_err();
        assert!(matches!(err, MediaError::InvalidComposition(_)));
    }

    #[test]
    fn test_color_cannot_reach_graph_syntax() {
        let err = compiler()
            .compile(&spec(serde_json::json!({
                "clips": clips(&[2.0, 2.0]),
                "captions": [{ "clipIndex": 0, "text": "hi", "color": "white;[0:v]null" }]
            })))
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::Configuration);

        let err = compiler()
            .compile(&spec(serde_json::json!({
                "clips": clips(&[2.0, 2.0]),
                "overlays": [{ "kind": "watermark", "text": "x", "color": "red:enable=1" }]
            })))
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::Configuration);
    }

    #[test]
    fn test_dual_stack() {
        let dual: DualSourceSpec = serde_json::from_value(serde_json::json!({
            "primary": "/tmp/top.mp4",
            "secondary": "/tmp/bottom.mp4",
            "secondaryVolume": 0.0,
            "quality": "720p"
        }))
        .unwrap();

        let program = compiler()
            .compile_dual(
                &dual,
                SourceInfo { duration: 12.0, has_audio: true },
                SourceInfo { duration: 9.0, has_audio: true },
            )
            .unwrap();

        assert_eq!(program.total_duration, 9.0);
        assert_eq!(program.encoding.width, 720);
        let graph = program.filter_graph();
        assert!(graph.contains("scale=720:640:force_original_aspect_ratio=decrease"));
        assert!(graph.contains("[src0][src1]vstack=inputs=2:shortest=1[stack]"));
        assert!(graph.contains("[0:a]volume=1[aout]"));
        assert!(graph.ends_with("[stack]format=yuv420p[vout]"));
    }

    #[test]
    fn test_dual_requires_durations() {
        let dual: DualSourceSpec = serde_json::from_value(serde_json::json!({
            "primary": "/tmp/top.mp4",
            "secondary": "/tmp/bottom.mp4"
        }))
        .unwrap();
        let result = compiler().compile_dual(
            &dual,
            SourceInfo { duration: 0.0, has_audio: false },
            SourceInfo { duration: 4.0, has_audio: false },
        );
        assert!(result.is_err());
    }
}
