//! Pure Rust pixel engine — no system libraries, everything statically linked.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP) | `image` crate (pure Rust decoders) |
//! | Decode (AVIF) | `avif-parse` (container) + `rav1d` (AV1 decode) + YUV→RGB |
//! | Resize | `image` `resize`/`resize_exact` with `Lanczos3` filter |
//! | Crop | `image::DynamicImage::crop_imm` |
//! | Encode → JPEG | `JpegEncoder::new_with_quality` |
//! | Encode → PNG | `PngEncoder::new_with_quality` (level mapped to Fast/Default/Best) |
//! | Encode → WebP | `WebPEncoder` (lossless) |
//! | Encode → AVIF | `AvifEncoder` (rav1e, speed 6) |
//! | Encode → TIFF | `TiffEncoder` (LZW) |
//! | EXIF orientation / density | custom parser (JPEG APP1 + TIFF IFD) |
//!
//! ## Encoder limitations
//!
//! Two of the requested knobs have no pure-Rust implementation and are mapped
//! to the nearest supported mode:
//!
//! - The `image` crate's WebP encoder is **lossless-only**. A lossy-quality
//!   WebP request is encoded losslessly; the quality knob has no effect.
//! - rav1e has no true lossless AVIF mode. A lossless AVIF request is encoded
//!   at quality 100, the encoder's maximum.

use super::avif;
use super::exif;
use super::{CodecError, ColorClass, CropJob, Dimensions, ImageCodec, ImageInfo, ReencodeJob, ResizeJob};
use crate::format::{EncodeOptions, ImageFormat};
use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::codecs::tiff::TiffEncoder;
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// AVIF encoder speed (0 = slowest/best, 10 = fastest). 6 keeps encoding
/// tolerable without visible quality loss at the sizes this tool handles.
const AVIF_SPEED: u8 = 6;

/// Pure Rust engine built on the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct PixelEngine;

impl PixelEngine {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PixelEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn is_avif(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("avif"))
}

/// Load and decode an image from disk.
///
/// The container is sniffed from file content, not the extension, so sources
/// with missing or misleading extensions still decode. AVIF goes through the
/// rav1d path — the `image` crate's `"avif"` feature is encode-only.
fn load_image(path: &Path) -> Result<DynamicImage, CodecError> {
    if is_avif(path) {
        return avif::decode(path);
    }
    ImageReader::open(path)
        .map_err(CodecError::Io)?
        .with_guessed_format()
        .map_err(CodecError::Io)?
        .decode()
        .map_err(|e| CodecError::Decode(format!("Failed to decode {}: {}", path.display(), e)))
}

/// Map a sniffed container format onto the closed output enumeration.
fn container_format(format: image::ImageFormat) -> Option<ImageFormat> {
    match format {
        image::ImageFormat::Jpeg => Some(ImageFormat::Jpeg),
        image::ImageFormat::Png => Some(ImageFormat::Png),
        image::ImageFormat::WebP => Some(ImageFormat::WebP),
        image::ImageFormat::Avif => Some(ImageFormat::Avif),
        image::ImageFormat::Tiff => Some(ImageFormat::Tiff),
        _ => None,
    }
}

/// Encode `img` to `path` with the given per-format settings.
///
/// The encoder is chosen by the options variant alone; the output path's
/// extension is never consulted here.
fn encode(img: &DynamicImage, path: &Path, options: EncodeOptions) -> Result<(), CodecError> {
    let file = File::create(path).map_err(CodecError::Io)?;
    let mut writer = BufWriter::new(file);
    let encode_err =
        |e: image::ImageError| CodecError::Encode(format!("{} encode failed: {}", path.display(), e));

    match options {
        EncodeOptions::Jpeg { quality } => {
            // JPEG has no alpha channel; grayscale sources stay grayscale.
            use image::ColorType::*;
            let flat = match img.color() {
                L8 | L16 | La8 | La16 => DynamicImage::ImageLuma8(img.to_luma8()),
                _ => DynamicImage::ImageRgb8(img.to_rgb8()),
            };
            let encoder = JpegEncoder::new_with_quality(&mut writer, quality);
            flat.write_with_encoder(encoder).map_err(encode_err)
        }
        EncodeOptions::Png { compression_level } => {
            // The png crate exposes effort presets, not raw zlib levels.
            let compression = match compression_level {
                9 => CompressionType::Best,
                0..=3 => CompressionType::Fast,
                _ => CompressionType::Default,
            };
            let encoder = PngEncoder::new_with_quality(&mut writer, compression, PngFilter::Adaptive);
            img.write_with_encoder(encoder).map_err(encode_err)
        }
        EncodeOptions::WebP { .. } => {
            // Lossless-only encoder; see the module docs.
            let flat = flatten_for_web(img);
            let encoder = WebPEncoder::new_lossless(&mut writer);
            flat.write_with_encoder(encoder).map_err(encode_err)
        }
        EncodeOptions::Avif { quality, lossless } => {
            let q = if lossless { 100 } else { quality };
            let flat = flatten_for_web(img);
            let encoder = AvifEncoder::new_with_speed_quality(&mut writer, AVIF_SPEED, q);
            flat.write_with_encoder(encoder).map_err(encode_err)
        }
        EncodeOptions::Tiff => {
            let flat = flatten_for_web(img);
            let encoder = TiffEncoder::new(&mut writer);
            flat.write_with_encoder(encoder).map_err(encode_err)
        }
    }
}

/// Reduce exotic sample layouts to 8-bit RGB/RGBA, which every encoder here
/// accepts. Alpha is kept only when the source actually has it.
fn flatten_for_web(img: &DynamicImage) -> DynamicImage {
    if img.color().has_alpha() {
        DynamicImage::ImageRgba8(img.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(img.to_rgb8())
    }
}

impl ImageCodec for PixelEngine {
    fn identify(&self, path: &Path) -> Result<Dimensions, CodecError> {
        if is_avif(path) {
            return avif::identify(path);
        }
        let (width, height) = ImageReader::open(path)
            .map_err(CodecError::Io)?
            .with_guessed_format()
            .map_err(CodecError::Io)?
            .into_dimensions()
            .map_err(|e| {
                CodecError::Decode(format!(
                    "Failed to read dimensions of {}: {}",
                    path.display(),
                    e
                ))
            })?;
        Ok(Dimensions { width, height })
    }

    fn probe(&self, path: &Path) -> Result<ImageInfo, CodecError> {
        if is_avif(path) {
            let dims = avif::identify(path)?;
            return Ok(ImageInfo {
                format: ImageFormat::Avif,
                width: dims.width,
                height: dims.height,
                color: ColorClass::Srgb,
                density_dpi: None,
                orientation: None,
            });
        }

        let reader = ImageReader::open(path)
            .map_err(CodecError::Io)?
            .with_guessed_format()
            .map_err(CodecError::Io)?;
        let format = reader.format().and_then(container_format).ok_or_else(|| {
            CodecError::Decode(format!("Unrecognized image container: {}", path.display()))
        })?;
        let img = reader.decode().map_err(|e| {
            CodecError::Decode(format!("Failed to decode {}: {}", path.display(), e))
        })?;

        let exif = exif::read_summary(path);
        Ok(ImageInfo {
            format,
            width: img.width(),
            height: img.height(),
            color: ColorClass::from_color(img.color()),
            density_dpi: exif.density_dpi,
            orientation: exif.orientation,
        })
    }

    fn reencode(&self, job: &ReencodeJob) -> Result<(), CodecError> {
        let img = load_image(&job.source)?;
        encode(&img, &job.output, job.options)
    }

    fn resize(&self, job: &ResizeJob) -> Result<(), CodecError> {
        let img = load_image(&job.source)?;
        let resized = match (job.width, job.height) {
            // No target dimensions: pass-through re-encode.
            (None, None) => img,
            (Some(w), Some(h)) if job.contain => img.resize(w, h, FilterType::Lanczos3),
            (Some(w), Some(h)) => img.resize_exact(w, h, FilterType::Lanczos3),
            // One dimension given: the other follows the source aspect ratio.
            (Some(w), None) => {
                let h = scaled_dimension(w, img.width(), img.height());
                img.resize_exact(w, h, FilterType::Lanczos3)
            }
            (None, Some(h)) => {
                let w = scaled_dimension(h, img.height(), img.width());
                img.resize_exact(w, h, FilterType::Lanczos3)
            }
        };
        encode(&resized, &job.output, job.options)
    }

    fn crop(&self, job: &CropJob) -> Result<(), CodecError> {
        let img = load_image(&job.source)?;
        let r = job.region;
        if r.left as u64 + r.width as u64 > img.width() as u64
            || r.top as u64 + r.height as u64 > img.height() as u64
        {
            return Err(CodecError::Decode(format!(
                "Crop region outside {}x{} source",
                img.width(),
                img.height()
            )));
        }
        let cropped = img.crop_imm(r.left, r.top, r.width, r.height);
        encode(&cropped, &job.output, job.options)
    }
}

/// Project `given` from one source edge onto the other, preserving aspect.
fn scaled_dimension(given: u32, src_given: u32, src_other: u32) -> u32 {
    ((given as f64 * src_other as f64 / src_given as f64).round() as u32).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{create_test_jpeg, create_test_png};

    #[test]
    fn identify_synthetic_jpeg() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("test.jpg");
        create_test_jpeg(&path, 200, 150);

        let engine = PixelEngine::new();
        let dims = engine.identify(&path).unwrap();
        assert_eq!(dims.width, 200);
        assert_eq!(dims.height, 150);
    }

    #[test]
    fn identify_nonexistent_file_errors() {
        let engine = PixelEngine::new();
        assert!(engine.identify(Path::new("/nonexistent/image.jpg")).is_err());
    }

    #[test]
    fn identify_sniffs_content_despite_wrong_extension() {
        let tmp = tempfile::TempDir::new().unwrap();
        // PNG bytes behind a .jpg extension.
        let path = tmp.path().join("mislabeled.jpg");
        create_test_png(&path, 40, 30);

        let engine = PixelEngine::new();
        let dims = engine.identify(&path).unwrap();
        assert_eq!((dims.width, dims.height), (40, 30));
    }

    #[test]
    fn resize_exact_dimensions() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.jpg");
        create_test_jpeg(&source, 400, 300);

        let output = tmp.path().join("resized.png");
        let engine = PixelEngine::new();
        engine
            .resize(&ResizeJob {
                source,
                output: output.clone(),
                width: Some(123),
                height: Some(77),
                contain: false,
                options: EncodeOptions::Png {
                    compression_level: 6,
                },
            })
            .unwrap();

        let dims = engine.identify(&output).unwrap();
        assert_eq!((dims.width, dims.height), (123, 77));
    }

    #[test]
    fn resize_contain_fits_within_bounds() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.jpg");
        create_test_jpeg(&source, 400, 200); // 2:1

        let output = tmp.path().join("contained.png");
        let engine = PixelEngine::new();
        engine
            .resize(&ResizeJob {
                source,
                output: output.clone(),
                width: Some(100),
                height: Some(100),
                contain: true,
                options: EncodeOptions::Png {
                    compression_level: 6,
                },
            })
            .unwrap();

        // Long edge capped at 100, aspect preserved.
        let dims = engine.identify(&output).unwrap();
        assert_eq!((dims.width, dims.height), (100, 50));
    }

    #[test]
    fn resize_single_dimension_keeps_aspect() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.jpg");
        create_test_jpeg(&source, 400, 300);

        let output = tmp.path().join("w200.png");
        let engine = PixelEngine::new();
        engine
            .resize(&ResizeJob {
                source,
                output: output.clone(),
                width: Some(200),
                height: None,
                contain: false,
                options: EncodeOptions::Png {
                    compression_level: 6,
                },
            })
            .unwrap();

        let dims = engine.identify(&output).unwrap();
        assert_eq!((dims.width, dims.height), (200, 150));
    }

    #[test]
    fn resize_without_dimensions_is_passthrough() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.jpg");
        create_test_jpeg(&source, 64, 48);

        let output = tmp.path().join("copy.jpg");
        let engine = PixelEngine::new();
        engine
            .resize(&ResizeJob {
                source,
                output: output.clone(),
                width: None,
                height: None,
                contain: false,
                options: EncodeOptions::Jpeg { quality: 95 },
            })
            .unwrap();

        let dims = engine.identify(&output).unwrap();
        assert_eq!((dims.width, dims.height), (64, 48));
    }

    #[test]
    fn crop_extracts_region() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.png");
        create_test_png(&source, 100, 80);

        let output = tmp.path().join("crop.png");
        let engine = PixelEngine::new();
        engine
            .crop(&CropJob {
                source,
                output: output.clone(),
                region: crate::codec::CropRegion {
                    left: 10,
                    top: 20,
                    width: 50,
                    height: 40,
                },
                options: EncodeOptions::archival(ImageFormat::Png),
            })
            .unwrap();

        let dims = engine.identify(&output).unwrap();
        assert_eq!((dims.width, dims.height), (50, 40));
    }

    #[test]
    fn reencode_across_formats() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.jpg");
        create_test_jpeg(&source, 60, 40);

        let engine = PixelEngine::new();
        for (name, options) in [
            ("out.png", EncodeOptions::archival(ImageFormat::Png)),
            ("out.webp", EncodeOptions::archival(ImageFormat::WebP)),
            ("out.tiff", EncodeOptions::Tiff),
            ("out.jpg", EncodeOptions::Jpeg { quality: 90 }),
        ] {
            let output = tmp.path().join(name);
            engine
                .reencode(&ReencodeJob {
                    source: source.clone(),
                    output: output.clone(),
                    options,
                })
                .unwrap();
            let dims = engine.identify(&output).unwrap();
            assert_eq!((dims.width, dims.height), (60, 40), "{name}");
        }
    }

    #[test]
    fn probe_reports_sniffed_format() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("mislabeled.jpg");
        create_test_png(&path, 32, 32);

        let engine = PixelEngine::new();
        let info = engine.probe(&path).unwrap();
        assert_eq!(info.format, ImageFormat::Png);
        assert_eq!((info.width, info.height), (32, 32));
        assert_eq!(info.color, ColorClass::Srgb);
    }

    #[test]
    fn probe_rejects_non_image_content() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("not-an-image.png");
        std::fs::write(&path, b"plain text, not pixels").unwrap();

        let engine = PixelEngine::new();
        assert!(engine.probe(&path).is_err());
    }

    #[test]
    fn scaled_dimension_rounds_and_floors_at_one() {
        assert_eq!(scaled_dimension(200, 400, 300), 150);
        assert_eq!(scaled_dimension(1, 4000, 2), 1);
    }
}
