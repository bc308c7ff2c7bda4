//! The metadata record returned by the get-metadata operation.
//!
//! Combines filesystem facts (name, path, byte size) with the codec's header
//! probe (format, dimensions, color, EXIF). Derived read-only per request and
//! never persisted.

use crate::codec::ImageInfo;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Read-only structural report for one image file.
///
/// Optional fields are omitted from JSON output when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageMetadata {
    pub filename: String,
    pub path: String,
    /// File size in bytes.
    pub size: u64,
    /// Container format as sniffed from file content (e.g. "png", "jpeg").
    pub format: String,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Declared pixel density, e.g. "72 dpi".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    /// Broad color classification (e.g. "srgb", "b-w").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_space: Option<String>,
    /// Raw EXIF orientation tag (1–8).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orientation: Option<u16>,
}

impl ImageMetadata {
    /// Assemble the record from a path, its on-disk size, and a probe result.
    pub fn from_probe(path: &Path, size: u64, info: &ImageInfo) -> Self {
        Self {
            filename: path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            path: path.to_string_lossy().to_string(),
            size,
            format: info.format.name().to_string(),
            width: info.width,
            height: info.height,
            resolution: info.density_dpi.map(|dpi| format!("{dpi} dpi")),
            color_space: Some(info.color.as_str().to_string()),
            orientation: info.orientation,
        }
    }
}
