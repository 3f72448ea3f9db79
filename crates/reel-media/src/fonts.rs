//! Font lookup capability.
//!
//! `drawtext` needs either a font file or a fontconfig family name. The
//! compiler asks an injected [`FontResolver`] so compiled programs do not
//! depend on the host they were compiled on.

use std::path::PathBuf;

/// Resolves a font family to a font file.
pub trait FontResolver: Send + Sync {
    /// Font file for `family`, or `None` to let fontconfig pick by name.
    fn resolve(&self, family: &str, bold: bool) -> Option<PathBuf>;
}

/// Operating system whose font layout a table describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontPlatform {
    Linux,
    MacOs,
    Windows,
}

impl FontPlatform {
    /// Parse a platform name; unknown names fall back to Linux.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "macos" | "mac" | "darwin" => FontPlatform::MacOs,
            "windows" | "win" | "win32" => FontPlatform::Windows,
            _ => FontPlatform::Linux,
        }
    }

    /// Platform of the running process.
    pub fn host() -> Self {
        if cfg!(target_os = "macos") {
            FontPlatform::MacOs
        } else if cfg!(target_os = "windows") {
            FontPlatform::Windows
        } else {
            FontPlatform::Linux
        }
    }
}

/// (family, bold, path)
type FontEntry = (&'static str, bool, &'static str);

const LINUX_FONTS: &[FontEntry] = &[
    ("arial", false, "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf"),
    ("arial", true, "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf"),
    ("helvetica", false, "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf"),
    ("helvetica", true, "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf"),
    ("dejavu sans", false, "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf"),
    ("dejavu sans", true, "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf"),
    ("times new roman", false, "/usr/share/fonts/truetype/liberation/LiberationSerif-Regular.ttf"),
    ("times new roman", true, "/usr/share/fonts/truetype/liberation/LiberationSerif-Bold.ttf"),
];

const MACOS_FONTS: &[FontEntry] = &[
    ("arial", false, "/System/Library/Fonts/Supplemental/Arial.ttf"),
    ("arial", true, "/System/Library/Fonts/Supplemental/Arial Bold.ttf"),
    ("helvetica", false, "/System/Library/Fonts/Helvetica.ttc"),
    ("helvetica", true, "/System/Library/Fonts/Helvetica.ttc"),
    ("times new roman", false, "/System/Library/Fonts/Supplemental/Times New Roman.ttf"),
    ("times new roman", true, "/System/Library/Fonts/Supplemental/Times New Roman Bold.ttf"),
];

const WINDOWS_FONTS: &[FontEntry] = &[
    ("arial", false, "C:\\Windows\\Fonts\\arial.ttf"),
    ("arial", true, "C:\\Windows\\Fonts\\arialbd.ttf"),
    ("impact", false, "C:\\Windows\\Fonts\\impact.ttf"),
    ("impact", true, "C:\\Windows\\Fonts\\impact.ttf"),
    ("times new roman", false, "C:\\Windows\\Fonts\\times.ttf"),
    ("times new roman", true, "C:\\Windows\\Fonts\\timesbd.ttf"),
];

/// Fixed per-platform font table. Pure: never touches the filesystem.
#[derive(Debug, Clone)]
pub struct StaticFontTable {
    platform: FontPlatform,
    entries: &'static [FontEntry],
}

impl StaticFontTable {
    /// Bundled font paths for `platform`.
    pub fn for_platform(platform: FontPlatform) -> Self {
        let entries = match platform {
            FontPlatform::Linux => LINUX_FONTS,
            FontPlatform::MacOs => MACOS_FONTS,
            FontPlatform::Windows => WINDOWS_FONTS,
        };
        Self { platform, entries }
    }

    /// Table for the platform this binary runs on.
    pub fn host() -> Self {
        Self::for_platform(FontPlatform::host())
    }

    /// Platform the table describes.
    pub fn platform(&self) -> FontPlatform {
        self.platform
    }
}

impl FontResolver for StaticFontTable {
    fn resolve(&self, family: &str, bold: bool) -> Option<PathBuf> {
        let family = family.trim().to_ascii_lowercase();
        self.entries
            .iter()
            .find(|(name, is_bold, _)| *name == family && *is_bold == bold)
            .map(|(_, _, path)| PathBuf::from(path))
    }
}

/// Resolver that never returns a file; every font is picked by fontconfig.
#[derive(Debug, Clone, Copy, Default)]
pub struct FontconfigOnly;

impl FontResolver for FontconfigOnly {
    fn resolve(&self, _family: &str, _bold: bool) -> Option<PathBuf> {
        None
    }
}
