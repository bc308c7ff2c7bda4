//! The five image operations.
//!
//! Each operation validates its request, derives encode options through the
//! format policy, hands a job to the codec, and reports the written output
//! path (or, for get-metadata, the metadata record). Requests deserialize
//! from the camelCase wire shape used by batch descriptors, so an operation
//! behaves identically whether invoked directly or from a batch.
//!
//! | Operation | Output format comes from | Encode options |
//! |---|---|---|
//! | resize | output path extension | caller quality, lossy context |
//! | compress | **source** path extension (format never changes) | caller quality/lossless, lossless context |
//! | convert | explicit target format | archival |
//! | crop | output path extension | archival |
//! | get-metadata | — (read-only) | — |

use crate::codec::{CodecError, CropJob, CropRegion, ImageCodec, ReencodeJob, ResizeJob};
use crate::format::{EncodeOptions, ImageFormat, derive_encode_options};
use crate::metadata::ImageMetadata;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OpError {
    #[error("Image file does not exist: {0}")]
    SourceNotFound(PathBuf),
    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),
    #[error(
        "Crop region {left},{top} {width}x{height} exceeds source bounds {source_width}x{source_height}"
    )]
    InvalidCropRegion {
        left: u32,
        top: u32,
        width: u32,
        height: u32,
        source_width: u32,
        source_height: u32,
    },
    #[error("Failed to extract metadata for {path}: {source}")]
    MetadataExtraction { path: PathBuf, source: CodecError },
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("Unknown tool: {0}")]
    UnknownOperation(String),
    #[error("Invalid options for {tool}: {message}")]
    InvalidOptions { tool: String, message: String },
}

/// What a successful operation hands back: a written path, or metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OperationOutput {
    Path(PathBuf),
    Metadata(ImageMetadata),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResizeRequest {
    pub image_path: PathBuf,
    pub output_path: PathBuf,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    /// Fit within the bounds instead of stretching to them.
    #[serde(default)]
    pub keep_aspect_ratio: bool,
    #[serde(default)]
    pub quality: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressRequest {
    pub image_path: PathBuf,
    pub output_path: PathBuf,
    #[serde(default)]
    pub quality: Option<u8>,
    /// Defaults to lossless when unset.
    #[serde(default)]
    pub lossless: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertRequest {
    pub image_path: PathBuf,
    pub output_path: PathBuf,
    pub format: ImageFormat,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CropRequest {
    pub image_path: PathBuf,
    pub output_path: PathBuf,
    /// X of the top-left corner of the extraction rectangle, in pixels.
    pub left: u32,
    /// Y of the top-left corner of the extraction rectangle, in pixels.
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataRequest {
    pub image_path: PathBuf,
}

fn ensure_source(path: &Path) -> Result<(), OpError> {
    if !path.exists() {
        return Err(OpError::SourceNotFound(path.to_path_buf()));
    }
    Ok(())
}

/// Resolve the output format from a destination path's extension.
fn output_format(path: &Path) -> Result<ImageFormat, OpError> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    ImageFormat::from_extension(ext).ok_or_else(|| OpError::UnsupportedFormat(ext.to_string()))
}

/// Resize a source image and write it to the request's output path.
///
/// The output format is inferred from the output path's extension. With
/// neither width nor height the image is re-encoded unchanged.
pub fn resize_image(codec: &impl ImageCodec, req: &ResizeRequest) -> Result<PathBuf, OpError> {
    ensure_source(&req.image_path)?;
    let format = output_format(&req.output_path)?;
    let options = derive_encode_options(format, req.quality, None, false);
    codec.resize(&ResizeJob {
        source: req.image_path.clone(),
        output: req.output_path.clone(),
        width: req.width,
        height: req.height,
        contain: req.keep_aspect_ratio,
        options,
    })?;
    Ok(req.output_path.clone())
}

/// Re-encode a source image with tighter settings, keeping its format.
///
/// The format axis is the **source** extension — compression never converts.
/// A source extension outside the supported set is not an error: the format
/// is sniffed from file content instead and the re-encode proceeds with that
/// format's derived options.
pub fn compress_image(codec: &impl ImageCodec, req: &CompressRequest) -> Result<PathBuf, OpError> {
    ensure_source(&req.image_path)?;
    let format = match ImageFormat::from_path(&req.image_path) {
        Some(format) => format,
        None => codec.probe(&req.image_path)?.format,
    };
    let options = derive_encode_options(format, req.quality, req.lossless, true);
    codec.reencode(&ReencodeJob {
        source: req.image_path.clone(),
        output: req.output_path.clone(),
        options,
    })?;
    Ok(req.output_path.clone())
}

/// Convert a source image to another format at maximum fidelity.
pub fn convert_format(codec: &impl ImageCodec, req: &ConvertRequest) -> Result<PathBuf, OpError> {
    ensure_source(&req.image_path)?;
    codec.reencode(&ReencodeJob {
        source: req.image_path.clone(),
        output: req.output_path.clone(),
        options: EncodeOptions::archival(req.format),
    })?;
    Ok(req.output_path.clone())
}

/// Extract a rectangular region and write it at maximum fidelity.
///
/// The region is validated against the source dimensions before the codec
/// runs, so a bad rectangle fails fast with a geometry error rather than a
/// decode-stage failure.
pub fn crop_image(codec: &impl ImageCodec, req: &CropRequest) -> Result<PathBuf, OpError> {
    ensure_source(&req.image_path)?;
    let format = output_format(&req.output_path)?;
    let dims = codec.identify(&req.image_path)?;

    let fits = req.width > 0
        && req.height > 0
        && req.left as u64 + req.width as u64 <= dims.width as u64
        && req.top as u64 + req.height as u64 <= dims.height as u64;
    if !fits {
        return Err(OpError::InvalidCropRegion {
            left: req.left,
            top: req.top,
            width: req.width,
            height: req.height,
            source_width: dims.width,
            source_height: dims.height,
        });
    }

    codec.crop(&CropJob {
        source: req.image_path.clone(),
        output: req.output_path.clone(),
        region: CropRegion {
            left: req.left,
            top: req.top,
            width: req.width,
            height: req.height,
        },
        options: EncodeOptions::archival(format),
    })?;
    Ok(req.output_path.clone())
}

/// Report filesystem and structural metadata for an image. Read-only.
pub fn image_metadata(
    codec: &impl ImageCodec,
    req: &MetadataRequest,
) -> Result<ImageMetadata, OpError> {
    ensure_source(&req.image_path)?;
    let size = std::fs::metadata(&req.image_path)
        .map_err(|e| OpError::MetadataExtraction {
            path: req.image_path.clone(),
            source: CodecError::Io(e),
        })?
        .len();
    let info = codec
        .probe(&req.image_path)
        .map_err(|source| OpError::MetadataExtraction {
            path: req.image_path.clone(),
            source,
        })?;
    Ok(ImageMetadata::from_probe(&req.image_path, size, &info))
}
