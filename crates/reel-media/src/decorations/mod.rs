//! Time-gated draw operations layered on the joined video stream.
//!
//! Each builder takes the current stream label and returns a [`Fragment`]
//! whose output is the decorated stream. A builder with nothing to draw
//! returns its input unchanged and adds no stages.

mod caption;
mod overlay;
mod ranking;
mod title;

pub use caption::build_captions;
pub use overlay::build_overlays;
pub use ranking::build_ranking;
pub use title::build_title;

use crate::escape::{escape_filter_path, escape_text, quoted};
use crate::fonts::FontResolver;
use crate::graph::{num, Filter, Fragment};
use crate::labels::StreamLabel;
use crate::timeline::{ClipTimeline, ClipWindow};

/// Family used where a decoration has no font setting.
pub const DEFAULT_FONT_FAMILY: &str = "Arial";

/// Everything a decoration builder needs to know about the output.
pub struct DecorationContext<'a> {
    pub width: u32,
    pub height: u32,
    pub timeline: &'a ClipTimeline,
    pub fonts: &'a dyn FontResolver,
}

impl DecorationContext<'_> {
    /// Composition length in seconds.
    pub fn total_duration(&self) -> f64 {
        self.timeline.total_duration()
    }

    /// Add `fontfile` when the resolver knows the family, else `font`.
    pub fn with_font(&self, filter: Filter, family: &str, bold: bool) -> Filter {
        match self.fonts.resolve(family, bold) {
            Some(path) => filter.arg(
                "fontfile",
                quoted(&escape_filter_path(&path.to_string_lossy())),
            ),
            None => filter.arg("font", quoted(&escape_text(family))),
        }
    }
}

/// `enable` expression for a half-open `[start, end)` window.
pub fn window_gate(window: ClipWindow) -> String {
    quoted(&format!("gte(t,{})*lt(t,{})", num(window.start), num(window.end)))
}

/// `drawtext` with literal (non-expanded) text.
pub(crate) fn drawtext(escaped_text: &str) -> Filter {
    Filter::new("drawtext")
        .arg("text", quoted(escaped_text))
        .arg("expansion", "none")
}

pub(crate) fn passthrough(input: StreamLabel) -> Fragment {
    Fragment {
        stages: Vec::new(),
        output: input,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::{FontPlatform, FontconfigOnly, StaticFontTable};

    #[test]
    fn test_window_gate_is_half_open() {
        let gate = window_gate(ClipWindow { start: 5.0, end: 8.25 });
        assert_eq!(gate, "'gte(t,5)*lt(t,8.25)'");
    }

    #[test]
    fn test_font_selection() {
        let timeline = ClipTimeline::build(&[1.0]).unwrap();
        let table = StaticFontTable::for_platform(FontPlatform::Windows);
        let ctx = DecorationContext {
            width: 1080,
            height: 1920,
            timeline: &timeline,
            fonts: &table,
        };
        let filter = ctx.with_font(Filter::new("drawtext"), "Arial", false);
        assert_eq!(filter.param("fontfile"), Some(r"'C\:\\Windows\\Fonts\\arial.ttf'"));

        let ctx = DecorationContext {
            fonts: &FontconfigOnly,
            ..ctx
        };
        let filter = ctx.with_font(Filter::new("drawtext"), "Arial", false);
        assert_eq!(filter.param("font"), Some("'Arial'"));
        assert_eq!(filter.param("fontfile"), None);
    }
}
