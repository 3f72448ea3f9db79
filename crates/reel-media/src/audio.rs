//! Audio chains.
//!
//! The single-track pipeline carries either no audio or background music.
//! Original clip audio is never mixed with music. The two-source pipeline
//! mixes, passes through or drops the sources' own audio by volume.

use reel_models::AudioConfig;

use crate::graph::{num, Filter, FilterStage, Fragment, InputFile};
use crate::labels::{LabelAllocator, StreamKind, StreamLabel};

/// Length of the optional music fade-in and fade-out.
pub const MUSIC_FADE_SECS: f64 = 2.0;

/// Background music input plus the chain that produces the audio output.
#[derive(Debug, Clone, PartialEq)]
pub struct MusicTrack {
    pub input: InputFile,
    pub fragment: Fragment,
}

/// Music chain reading input file `input_index`, trimmed to `total_duration`.
///
/// The input is looped at demux level so a short track still covers the
/// whole composition.
pub fn build_music(
    config: &AudioConfig,
    input_index: usize,
    total_duration: f64,
    labels: &mut LabelAllocator,
) -> MusicTrack {
    let input = InputFile::new(&config.source).with_options(["-stream_loop", "-1"]);

    let mut filters = vec![Filter::new("volume").positional(num(config.volume))];

    if config.fade_in {
        filters.push(
            Filter::new("afade")
                .arg("t", "in")
                .arg("st", 0)
                .arg("d", num(MUSIC_FADE_SECS)),
        );
    }

    if config.fade_out {
        let fade = MUSIC_FADE_SECS.min(total_duration);
        filters.push(
            Filter::new("afade")
                .arg("t", "out")
                .arg("st", num((total_duration - fade).max(0.0)))
                .arg("d", num(fade)),
        );
    }

    filters.push(Filter::new("atrim").arg("duration", num(total_duration)));
    filters.push(Filter::new("asetpts").positional("PTS-STARTPTS"));

    let output = labels.allocate_named(StreamKind::AudioOut);
    let stage = FilterStage::chain(StreamLabel::input_audio(input_index), filters, output.clone());

    MusicTrack {
        input,
        fragment: Fragment::single(stage, output),
    }
}

/// Audio of one stacked source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceAudio {
    pub volume: f64,
    pub has_audio: bool,
}

impl SourceAudio {
    fn audible(&self) -> bool {
        self.has_audio && self.volume > 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DualAudioMode {
    Silent,
    /// Pass through the source at this input index
    Single(usize),
    Mix,
}

impl DualAudioMode {
    /// Decide which sources reach the output track.
    pub fn select(primary: SourceAudio, secondary: SourceAudio) -> Self {
        match (primary.audible(), secondary.audible()) {
            (true, true) => DualAudioMode::Mix,
            (true, false) => DualAudioMode::Single(0),
            (false, true) => DualAudioMode::Single(1),
            (false, false) => DualAudioMode::Silent,
        }
    }
}

/// Audio chain for a two-source render reading inputs 0 and 1.
pub fn build_dual_audio(
    primary: SourceAudio,
    secondary: SourceAudio,
    labels: &mut LabelAllocator,
) -> Option<Fragment> {
    let sources = [primary, secondary];

    match DualAudioMode::select(primary, secondary) {
        DualAudioMode::Silent => None,
        DualAudioMode::Single(index) => {
            let output = labels.allocate_named(StreamKind::AudioOut);
            let stage = FilterStage::chain(
                StreamLabel::input_audio(index),
                vec![Filter::new("volume").positional(num(sources[index].volume))],
                output.clone(),
            );
            Some(Fragment::single(stage, output))
        }
        DualAudioMode::Mix => {
            let mut stages = Vec::with_capacity(3);
            let mut voices = Vec::with_capacity(2);
            for (index, source) in sources.iter().enumerate() {
                let voice = labels.allocate(StreamKind::Voice, index);
                stages.push(FilterStage::chain(
                    StreamLabel::input_audio(index),
                    vec![Filter::new("volume").positional(num(source.volume))],
                    voice.clone(),
                ));
                voices.push(voice);
            }

            let output = labels.allocate_named(StreamKind::AudioOut);
            stages.push(FilterStage::new(
                voices,
                vec![Filter::new("amix")
                    .arg("inputs", 2)
                    .arg("duration", "shortest")
                    .arg("dropout_transition", 0)],
                vec![output.clone()],
            ));
            Some(Fragment { stages, output })
        }
    }
}
