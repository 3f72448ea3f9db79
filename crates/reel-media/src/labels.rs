//! Stream label allocation for filter graphs.
//!
//! Every intermediate signal in a compiled program gets its own label. Labels
//! are derived from a kind prefix and an index so the same composition always
//! yields the same names, and the allocator refuses to hand out a name twice.

use std::collections::HashSet;
use std::fmt;

/// Name of one audio/video signal inside a filter graph.
///
/// Two forms exist: labels produced by a stage (`clip0`, `xf1`) and input
/// pads that refer to a stream of an input file (`0:v`, `2:a`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamLabel(String);

impl StreamLabel {
    /// Video stream of input file `index`.
    pub fn input_video(index: usize) -> Self {
        Self(format!("{}:v", index))
    }

    /// Audio stream of input file `index`.
    pub fn input_audio(index: usize) -> Self {
        Self(format!("{}:a", index))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this label names an input file stream rather than a stage output.
    pub fn is_input_pad(&self) -> bool {
        self.0.contains(':')
    }

    /// Input file index of an input pad.
    pub fn input_index(&self) -> Option<usize> {
        let (index, _) = self.0.split_once(':')?;
        index.parse().ok()
    }

    /// Bracketed form used in filter graphs and `-map`.
    pub fn bracketed(&self) -> String {
        format!("[{}]", self.0)
    }
}

impl fmt::Display for StreamLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Category of an intermediate signal; each has a distinct label prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    /// Trimmed and fitted clip
    Clip,
    /// Background color source
    Canvas,
    /// Clip composited onto its canvas
    Placed,
    /// Result of joining clips
    Join,
    /// Edge transform applied before a custom transition
    Transform,
    Caption,
    Overlay,
    /// Generated source used by an overlay (e.g. progress bar)
    OverlaySource,
    Title,
    Rank,
    /// Per-source video of the stacked layout
    Source,
    Stack,
    Music,
    /// Volume-scaled audio of one source
    Voice,
    VideoOut,
    AudioOut,
}

impl StreamKind {
    /// Label prefix for this kind.
    pub fn prefix(&self) -> &'static str {
        match self {
            StreamKind::Clip => "clip",
            StreamKind::Canvas => "canvas",
            StreamKind::Placed => "placed",
            StreamKind::Join => "xf",
            StreamKind::Transform => "edge",
            StreamKind::Caption => "cap",
            StreamKind::Overlay => "ovl",
            StreamKind::OverlaySource => "ovlsrc",
            StreamKind::Title => "title",
            StreamKind::Rank => "rank",
            StreamKind::Source => "src",
            StreamKind::Stack => "stack",
            StreamKind::Music => "music",
            StreamKind::Voice => "voice",
            StreamKind::VideoOut => "vout",
            StreamKind::AudioOut => "aout",
        }
    }
}

/// Hands out unique labels for one compile.
#[derive(Debug, Default)]
pub struct LabelAllocator {
    issued: HashSet<String>,
}

impl LabelAllocator {
    /// Allocator with no labels handed out.
    pub fn new() -> Self {
        Self::default()
    }

    /// Label for the `index`-th signal of `kind`.
    ///
    /// Repeating a `(kind, index)` pair yields a suffixed name, never a duplicate.
    pub fn allocate(&mut self, kind: StreamKind, index: usize) -> StreamLabel {
        self.reserve(format!("{}{}", kind.prefix(), index))
    }

    /// Label for a singleton signal such as the final outputs.
    pub fn allocate_named(&mut self, kind: StreamKind) -> StreamLabel {
        self.reserve(kind.prefix().to_string())
    }

    /// Number of labels issued so far.
    pub fn issued(&self) -> usize {
        self.issued.len()
    }

    fn reserve(&mut self, base: String) -> StreamLabel {
        let mut name = base.clone();
        let mut suffix = 1;
        while !self.issued.insert(name.clone()) {
            name = format!("{}_{}", base, suffix);
            suffix += 1;
        }
        StreamLabel(name)
    }
}
