//! Minimal EXIF reader for JPEG and TIFF files.
//!
//! Extracts the two fields metadata output reports:
//! - Orientation (tag 0x0112) — raw EXIF value 1–8
//! - Pixel density (tags 0x011A XResolution + 0x0128 ResolutionUnit),
//!   normalized to dots per inch
//!
//! For JPEG: the EXIF payload lives in an APP1 segment prefixed `Exif\0\0`,
//! which wraps a little TIFF block. For TIFF: the file *is* the TIFF block.
//! Either way the work is walking IFD0's entries.
//!
//! Parsing is best-effort: any malformed structure yields an empty summary,
//! never an error — missing EXIF is the common case, not a failure.

use std::path::Path;

const TAG_ORIENTATION: u16 = 0x0112;
const TAG_X_RESOLUTION: u16 = 0x011A;
const TAG_RESOLUTION_UNIT: u16 = 0x0128;

/// EXIF fields surfaced in metadata output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExifSummary {
    pub orientation: Option<u16>,
    pub density_dpi: Option<u32>,
}

/// Read the EXIF summary for a file, dispatching by extension.
/// Returns an empty summary on any read or parse failure.
pub fn read_summary(path: &Path) -> ExifSummary {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(_) => return ExifSummary::default(),
    };

    match ext.as_str() {
        "jpg" | "jpeg" => find_jpeg_exif(&bytes)
            .map(parse_tiff_block)
            .unwrap_or_default(),
        "tif" | "tiff" => parse_tiff_block(&bytes),
        _ => ExifSummary::default(),
    }
}

/// Locate the TIFF block inside a JPEG's APP1 EXIF segment.
fn find_jpeg_exif(data: &[u8]) -> Option<&[u8]> {
    const EXIF_HEADER: &[u8] = b"Exif\0\0";

    if !data.starts_with(&[0xFF, 0xD8]) {
        return None;
    }

    let mut pos = 2; // past SOI
    while pos + 4 <= data.len() {
        if data[pos] != 0xFF {
            return None;
        }
        let marker = data[pos + 1];
        // SOS means entropy-coded data follows; EOI ends the file.
        if marker == 0xDA || marker == 0xD9 {
            return None;
        }
        // Standalone markers carry no length field.
        if marker == 0x01 || (0xD0..=0xD7).contains(&marker) {
            pos += 2;
            continue;
        }
        let seg_len = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
        let segment = data.get(pos + 4..pos + 2 + seg_len)?;
        if marker == 0xE1 && segment.starts_with(EXIF_HEADER) {
            return Some(&segment[EXIF_HEADER.len()..]);
        }
        pos += 2 + seg_len;
    }
    None
}

/// Walk IFD0 of a TIFF block and pick out the summary tags.
fn parse_tiff_block(data: &[u8]) -> ExifSummary {
    if data.len() < 8 {
        return ExifSummary::default();
    }

    let big_endian = match &data[0..2] {
        b"MM" => true,
        b"II" => false,
        _ => return ExifSummary::default(),
    };

    let read_u16 = |offset: usize| -> Option<u16> {
        let bytes = [*data.get(offset)?, *data.get(offset + 1)?];
        Some(if big_endian {
            u16::from_be_bytes(bytes)
        } else {
            u16::from_le_bytes(bytes)
        })
    };

    let read_u32 = |offset: usize| -> Option<u32> {
        let bytes = [
            *data.get(offset)?,
            *data.get(offset + 1)?,
            *data.get(offset + 2)?,
            *data.get(offset + 3)?,
        ];
        Some(if big_endian {
            u32::from_be_bytes(bytes)
        } else {
            u32::from_le_bytes(bytes)
        })
    };

    // TIFF magic
    if read_u16(2) != Some(42) {
        return ExifSummary::default();
    }

    let Some(ifd_offset) = read_u32(4) else {
        return ExifSummary::default();
    };
    let ifd_offset = ifd_offset as usize;

    let Some(entry_count) = read_u16(ifd_offset) else {
        return ExifSummary::default();
    };
    let entries_start = ifd_offset + 2;

    let mut summary = ExifSummary::default();
    let mut x_resolution: Option<f64> = None;
    let mut unit: Option<u16> = None;

    for i in 0..entry_count as usize {
        // Entry: tag (2) + type (2) + count (4) + value-or-offset (4)
        let entry = entries_start + i * 12;
        let Some(tag) = read_u16(entry) else { break };
        let Some(typ) = read_u16(entry + 2) else { break };

        match (tag, typ) {
            // SHORT values with count 1 are stored inline in the value field.
            (TAG_ORIENTATION, 3) => summary.orientation = read_u16(entry + 8),
            (TAG_RESOLUTION_UNIT, 3) => unit = read_u16(entry + 8),
            // RATIONAL is 8 bytes, always behind an offset.
            (TAG_X_RESOLUTION, 5) => {
                if let Some(offset) = read_u32(entry + 8) {
                    let offset = offset as usize;
                    if let (Some(num), Some(den)) = (read_u32(offset), read_u32(offset + 4))
                        && den != 0
                    {
                        x_resolution = Some(num as f64 / den as f64);
                    }
                }
            }
            _ => {}
        }
    }

    // ResolutionUnit: 2 = inch (the default), 3 = centimeter.
    summary.density_dpi = x_resolution.map(|res| {
        let dpi = match unit {
            Some(3) => res * 2.54,
            _ => res,
        };
        dpi.round() as u32
    });

    summary
}
