//! The pixel engine boundary.
//!
//! The [`ImageCodec`] trait defines everything the operation layer needs from
//! a codec: cheap dimension lookup, a full structural probe, and the three
//! write paths (re-encode, resize, crop). The production implementation is
//! [`PixelEngine`] — pure Rust, statically linked, no system libraries.
//!
//! Job structs describe *what* to do, not *how*: the operation layer fills
//! them in and the engine executes them. Keeping the seam here lets the
//! operation and batch logic be tested against a recording mock.

pub mod engine;

mod avif;
mod exif;

pub use engine::PixelEngine;

use crate::format::{EncodeOptions, ImageFormat};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Encode failed: {0}")]
    Encode(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Broad color classification, reported in metadata output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorClass {
    Srgb,
    Grayscale,
}

impl ColorClass {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Srgb => "srgb",
            Self::Grayscale => "b-w",
        }
    }

    pub fn from_color(color: image::ColorType) -> Self {
        use image::ColorType::*;
        match color {
            L8 | L16 | La8 | La16 => Self::Grayscale,
            _ => Self::Srgb,
        }
    }
}

/// Structural report from a header probe: the sniffed container format,
/// pixel dimensions, color class, and whatever EXIF carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
    pub color: ColorClass,
    /// Pixel density in dots per inch, when the file declares one.
    pub density_dpi: Option<u32>,
    /// Raw EXIF orientation tag value (1–8), when present.
    pub orientation: Option<u16>,
}

/// Decode a source and re-encode it unchanged to `output`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReencodeJob {
    pub source: PathBuf,
    pub output: PathBuf,
    pub options: EncodeOptions,
}

/// Scale a source to the given bounds.
///
/// With `contain` set, the image is fitted within `width`×`height` keeping
/// its aspect ratio; otherwise the dimensions are applied exactly. A missing
/// dimension is derived from the source aspect ratio; when both are missing
/// the job is a pass-through re-encode.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeJob {
    pub source: PathBuf,
    pub output: PathBuf,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub contain: bool,
    pub options: EncodeOptions,
}

/// Rectangular extraction region, top-left corner plus size, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

/// Extract a region from a source image.
#[derive(Debug, Clone, PartialEq)]
pub struct CropJob {
    pub source: PathBuf,
    pub output: PathBuf,
    pub region: CropRegion,
    pub options: EncodeOptions,
}

/// Trait for pixel engines.
///
/// `Sync` is required so batches can fan out over the engine from rayon
/// worker threads.
pub trait ImageCodec: Sync {
    /// Pixel dimensions from the file header, without a full decode.
    fn identify(&self, path: &Path) -> Result<Dimensions, CodecError>;

    /// Full structural probe: sniffed format, dimensions, color, EXIF.
    fn probe(&self, path: &Path) -> Result<ImageInfo, CodecError>;

    /// Decode and re-encode with the given options, no geometry change.
    fn reencode(&self, job: &ReencodeJob) -> Result<(), CodecError>;

    /// Execute a resize job.
    fn resize(&self, job: &ResizeJob) -> Result<(), CodecError>;

    /// Execute a crop job.
    fn crop(&self, job: &CropJob) -> Result<(), CodecError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mock codec that records jobs without touching any pixels.
    /// Uses Mutex (not RefCell) so it is Sync and works under rayon.
    #[derive(Default)]
    pub struct MockCodec {
        pub identify_results: Mutex<Vec<Dimensions>>,
        pub probe_results: Mutex<Vec<ImageInfo>>,
        pub jobs: Mutex<Vec<RecordedJob>>,
        /// Sources containing this substring fail with a decode error.
        pub fail_substring: Option<String>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedJob {
        Identify(String),
        Probe(String),
        Reencode(ReencodeJob),
        Resize(ResizeJob),
        Crop(CropJob),
    }

    impl MockCodec {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_dimensions(dims: Vec<Dimensions>) -> Self {
            Self {
                identify_results: Mutex::new(dims),
                ..Self::default()
            }
        }

        pub fn with_probes(probes: Vec<ImageInfo>) -> Self {
            Self {
                probe_results: Mutex::new(probes),
                ..Self::default()
            }
        }

        pub fn recorded(&self) -> Vec<RecordedJob> {
            self.jobs.lock().unwrap().clone()
        }

        fn check_source(&self, source: &Path) -> Result<(), CodecError> {
            if let Some(s) = &self.fail_substring
                && source.to_string_lossy().contains(s.as_str())
            {
                return Err(CodecError::Decode(format!(
                    "Failed to decode {}",
                    source.display()
                )));
            }
            Ok(())
        }
    }

    impl ImageCodec for MockCodec {
        fn identify(&self, path: &Path) -> Result<Dimensions, CodecError> {
            self.check_source(path)?;
            self.jobs
                .lock()
                .unwrap()
                .push(RecordedJob::Identify(path.to_string_lossy().to_string()));
            self.identify_results
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| CodecError::Decode("No mock dimensions".to_string()))
        }

        fn probe(&self, path: &Path) -> Result<ImageInfo, CodecError> {
            self.check_source(path)?;
            self.jobs
                .lock()
                .unwrap()
                .push(RecordedJob::Probe(path.to_string_lossy().to_string()));
            self.probe_results
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| CodecError::Decode("No mock probe info".to_string()))
        }

        fn reencode(&self, job: &ReencodeJob) -> Result<(), CodecError> {
            self.check_source(&job.source)?;
            self.jobs
                .lock()
                .unwrap()
                .push(RecordedJob::Reencode(job.clone()));
            Ok(())
        }

        fn resize(&self, job: &ResizeJob) -> Result<(), CodecError> {
            self.check_source(&job.source)?;
            self.jobs.lock().unwrap().push(RecordedJob::Resize(job.clone()));
            Ok(())
        }

        fn crop(&self, job: &CropJob) -> Result<(), CodecError> {
            self.check_source(&job.source)?;
            self.jobs.lock().unwrap().push(RecordedJob::Crop(job.clone()));
            Ok(())
        }
    }

    pub fn probe_info(format: ImageFormat, width: u32, height: u32) -> ImageInfo {
        ImageInfo {
            format,
            width,
            height,
            color: ColorClass::Srgb,
            density_dpi: None,
            orientation: None,
        }
    }

    #[test]
    fn mock_records_identify() {
        let codec = MockCodec::with_dimensions(vec![Dimensions {
            width: 800,
            height: 600,
        }]);

        let dims = codec.identify(Path::new("/test/image.jpg")).unwrap();
        assert_eq!(dims.width, 800);
        assert_eq!(dims.height, 600);

        let jobs = codec.recorded();
        assert_eq!(jobs.len(), 1);
        assert!(matches!(&jobs[0], RecordedJob::Identify(p) if p == "/test/image.jpg"));
    }

    #[test]
    fn mock_fail_substring_rejects_matching_sources() {
        let codec = MockCodec {
            fail_substring: Some("broken".to_string()),
            ..MockCodec::default()
        };

        let result = codec.reencode(&ReencodeJob {
            source: "/images/broken.png".into(),
            output: "/images/out.png".into(),
            options: EncodeOptions::archival(ImageFormat::Png),
        });
        assert!(matches!(result, Err(CodecError::Decode(_))));
        assert!(codec.recorded().is_empty());
    }

    #[test]
    fn mock_records_resize_job_fields() {
        let codec = MockCodec::new();
        codec
            .resize(&ResizeJob {
                source: "/a.jpg".into(),
                output: "/b.png".into(),
                width: Some(100),
                height: None,
                contain: true,
                options: EncodeOptions::Png {
                    compression_level: 6,
                },
            })
            .unwrap();

        let jobs = codec.recorded();
        assert!(matches!(
            &jobs[0],
            RecordedJob::Resize(ResizeJob {
                width: Some(100),
                height: None,
                contain: true,
                ..
            })
        ));
    }
}
