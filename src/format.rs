//! Output formats and the per-format encode option rules.
//!
//! Every operation that writes an image funnels through this module to decide
//! *how* to encode: which quality knob applies, what the defaults are, and
//! which formats have a lossless mode at all. The rules live in one place so
//! resize, compress, convert, and crop cannot drift apart.
//!
//! Each format has a different knob set, so options are a tagged union
//! ([`EncodeOptions`]) rather than a generic key-value bag:
//!
//! | Format | Knobs |
//! |--------|-------|
//! | JPEG   | quality 1–100 |
//! | PNG    | compression level 0–9 (effort, not visual quality) |
//! | WebP   | quality 1–100 + lossless flag |
//! | AVIF   | quality 1–100 + lossless flag |
//! | TIFF   | none (fixed LZW compression) |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// The closed set of supported output formats.
///
/// `jpg` and `jpeg` are the same format and parse to the same variant;
/// `tif` is accepted as a synonym for `tiff` on file extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageFormat {
    #[serde(rename = "jpeg", alias = "jpg")]
    Jpeg,
    #[serde(rename = "png")]
    Png,
    #[serde(rename = "webp")]
    WebP,
    #[serde(rename = "avif")]
    Avif,
    #[serde(rename = "tiff", alias = "tif")]
    Tiff,
}

impl ImageFormat {
    /// Parse a file extension (without the dot, any case) into a format.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "webp" => Some(Self::WebP),
            "avif" => Some(Self::Avif),
            "tif" | "tiff" => Some(Self::Tiff),
            _ => None,
        }
    }

    /// Parse the extension of a path. `None` when the extension is missing
    /// or not one of the supported formats.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Canonical lowercase name, as reported in metadata output.
    pub fn name(self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::WebP => "webp",
            Self::Avif => "avif",
            Self::Tiff => "tiff",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ImageFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s).ok_or_else(|| format!("unsupported format '{s}'"))
    }
}

/// Default lossy quality when the caller doesn't specify one.
const DEFAULT_QUALITY: u8 = 95;

/// PNG compression level used when losslessness wasn't asked for.
const PNG_LEVEL_RELAXED: u8 = 6;

/// PNG compression level for lossless / archival output.
const PNG_LEVEL_MAX: u8 = 9;

/// Format-specific encoder settings, one variant per format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeOptions {
    Jpeg { quality: u8 },
    /// `compression_level` is encoder effort/size (0–9), not visual quality.
    Png { compression_level: u8 },
    WebP { quality: u8, lossless: bool },
    Avif { quality: u8, lossless: bool },
    /// TIFF output always uses LZW compression; there is no quality axis.
    Tiff,
}

impl EncodeOptions {
    /// Maximum-fidelity settings for the given format.
    ///
    /// Used by format conversion and cropping, which never trade off quality:
    /// JPEG at 100, PNG at level 9, WebP/AVIF lossless, TIFF LZW.
    pub fn archival(format: ImageFormat) -> Self {
        match format {
            ImageFormat::Jpeg => Self::Jpeg { quality: 100 },
            ImageFormat::Png => Self::Png {
                compression_level: PNG_LEVEL_MAX,
            },
            ImageFormat::WebP => Self::WebP {
                quality: 100,
                lossless: true,
            },
            ImageFormat::Avif => Self::Avif {
                quality: 100,
                lossless: true,
            },
            ImageFormat::Tiff => Self::Tiff,
        }
    }
}

/// Derive encoder settings from a target format and the caller's knobs.
///
/// - `quality`: explicit numeric quality, if the caller gave one. For PNG
///   output this is reinterpreted as the compression level (PNG has no
///   quality axis) — deliberate cross-axis reuse, clamped to 0–9.
/// - `lossless`: explicit lossless preference, if the caller gave one.
/// - `default_lossless`: what "unset" means for the calling operation
///   (compression defaults to lossless, resizing does not).
///
/// JPEG has no lossless mode, so the flags are ignored there; TIFF has
/// neither axis.
pub fn derive_encode_options(
    format: ImageFormat,
    quality: Option<u8>,
    lossless: Option<bool>,
    default_lossless: bool,
) -> EncodeOptions {
    let lossless = lossless.unwrap_or(default_lossless);
    match format {
        ImageFormat::Jpeg => EncodeOptions::Jpeg {
            quality: clamp_quality(quality),
        },
        ImageFormat::Png => EncodeOptions::Png {
            // Losslessness wins; otherwise an explicit quality is
            // reinterpreted as the compression level.
            compression_level: match quality {
                _ if lossless => PNG_LEVEL_MAX,
                Some(q) => q.min(PNG_LEVEL_MAX),
                None => PNG_LEVEL_RELAXED,
            },
        },
        ImageFormat::WebP => EncodeOptions::WebP {
            quality: clamp_quality(quality),
            lossless,
        },
        ImageFormat::Avif => EncodeOptions::Avif {
            quality: clamp_quality(quality),
            lossless,
        },
        ImageFormat::Tiff => EncodeOptions::Tiff,
    }
}

fn clamp_quality(quality: Option<u8>) -> u8 {
    quality.unwrap_or(DEFAULT_QUALITY).clamp(1, 100)
}
