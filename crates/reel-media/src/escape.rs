//! Escaping of literals embedded in filter graphs.
//!
//! In the filter-graph grammar `,` chains filters, `;` separates stages,
//! `:` separates options, `[`/`]` delimit labels and `'` quotes values. Any
//! user text placed in a graph must have these characters escaped.

use crate::error::{MediaError, MediaResult};

/// Characters escaped in caption and overlay text.
const TEXT_SPECIALS: &[char] = &['\\', '\'', ':', '[', ']'];
/// Title text additionally escapes the chain and stage separators.
const TITLE_SPECIALS: &[char] = &['\\', '\'', ':', '[', ']', ',', ';'];

/// Color names FFmpeg understands that may be used directly.
const NAMED_COLORS: &[&str] = &[
    "black", "white", "red", "green", "blue", "yellow", "cyan", "magenta", "gray", "orange",
];

/// Escape caption/overlay text for a `drawtext` value.
pub fn escape_text(raw: &str) -> String {
    escape_with(raw, TEXT_SPECIALS)
}

/// Escape title text for a `drawtext` value.
pub fn escape_title(raw: &str) -> String {
    escape_with(raw, TITLE_SPECIALS)
}

/// Backslash-escape `specials`; characters already escaped are left alone,
/// so escaping twice yields the same string as escaping once.
fn escape_with(raw: &str, specials: &[char]) -> String {
    let mut out = String::with_capacity(raw.len() + 8);
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(&next) = chars.peek() {
                if specials.contains(&next) {
                    out.push('\\');
                    out.push(next);
                    chars.next();
                    continue;
                }
            }
            out.push_str(r"\\");
        } else if specials.contains(&c) {
            out.push('\\');
            out.push(c);
        } else {
            out.push(c);
        }
    }

    out
}

/// Escape a filesystem path used as a filter option (e.g. `fontfile`).
pub fn escape_filter_path(path: &str) -> String {
    path.replace('\\', "\\\\").replace('\'', "\\'").replace(':', "\\:")
}

/// Wrap an option value in single quotes.
///
/// The graph parser takes everything between quotes literally, so a quote
/// inside the value closes the quotes, adds `\\\'` and reopens them. The
/// option parser then reads `\'` and yields the quote.
pub fn quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');

    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('\'') => out.push_str(QUOTE_IN_QUOTES),
                Some(next) => {
                    out.push(c);
                    out.push(next);
                }
                None => out.push(c),
            },
            '\'' => out.push_str(QUOTE_IN_QUOTES),
            _ => out.push(c),
        }
    }

    out.push('\'');
    out
}

const QUOTE_IN_QUOTES: &str = r"'\\\''";

/// Convert `#RRGGBB` to FFmpeg's `0xRRGGBB` notation; a few plain names
/// pass through, anything else is rejected.
pub fn ffmpeg_color(color: &str) -> MediaResult<String> {
    if let Some(digits) = color.strip_prefix('#') {
        if digits.len() == 6 && digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Ok(format!("0x{}", digits.to_uppercase()));
        }
    }

    let name = color.to_ascii_lowercase();
    if NAMED_COLORS.contains(&name.as_str()) {
        return Ok(name);
    }

    Err(MediaError::invalid_composition(format!("Invalid color: {}", color)))
}

/// FFmpeg color with an alpha component.
pub fn ffmpeg_color_alpha(color: &str, alpha: f64) -> MediaResult<String> {
    Ok(format!("{}@{:.2}", ffmpeg_color(color)?, alpha.clamp(0.0, 1.0)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_text() {
        assert_eq!(escape_text("It's 10:30 [live]"), r"It\'s 10\:30 \[live\]");
        // Separators are left for the title grammar only.
        assert_eq!(escape_text("a, b; c"), "a, b; c");
    }

    #[test]
    fn test_escape_title_full_set() {
        assert_eq!(escape_title("' : [ ] , ;"), r"\' \: \[ \] \, \;");
    }

    #[test]
    fn test_escaping_is_idempotent() {
        let raw = "Top 5: it's [best], ok; go";
        let once = escape_title(raw);
        assert_eq!(escape_title(&once), once);

        let once = escape_text(raw);
        assert_eq!(escape_text(&once), once);
    }

    #[test]
    fn test_lone_backslash_is_doubled() {
        assert_eq!(escape_text(r"C\D"), r"C\\D");
        assert_eq!(escape_text("end\\"), "end\\\\");
        assert_eq!(escape_text(&escape_text(r"C\D")), r"C\\D");
    }

    #[test]
    fn test_quoted_reopens_around_quotes() {
        assert_eq!(quoted("gte(t,1)"), "'gte(t,1)'");
        assert_eq!(quoted(&escape_text("It's")), r"'It'\\\''s'");
        assert_eq!(quoted("a'b"), r"'a'\\\''b'");
        assert_eq!(quoted(r"C\\D"), r"'C\\D'");
    }

    #[test]
    fn test_filter_path() {
        assert_eq!(
            escape_filter_path("C:\\Windows\\Fonts\\arial.ttf"),
            "C\\:\\\\Windows\\\\Fonts\\\\arial.ttf"
        );
    }

    #[test]
    fn test_colors() {
        assert_eq!(ffmpeg_color("#ff3b30").unwrap(), "0xFF3B30");
        assert_eq!(ffmpeg_color("White").unwrap(), "white");
        assert_eq!(ffmpeg_color_alpha("#000000", 0.6).unwrap(), "0x000000@0.60");
    }

    #[test]
    fn test_unknown_colors_are_rejected() {
        for bad in ["white;[0:v]null", "#12345", "#GGGGGG", "", "red:t=fill"] {
            assert!(ffmpeg_color(bad).is_err(), "{}", bad);
        }
        assert!(ffmpeg_color_alpha("nope", 0.5).is_err());
    }
}
