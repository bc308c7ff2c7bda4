//! AVIF reading support.
//!
//! The `image` crate's `"avif"` feature only enables the **encoder** (rav1e);
//! decoding would require `"avif-native"` and the C library dav1d. To stay
//! fully statically linked, files are read with `avif-parse` (container) and
//! `rav1d` (pure Rust port of dav1d), then converted YUV→RGB here.
//!
//! [`identify`] reads dimensions from the container metadata alone, without
//! touching the AV1 payload.

use super::{CodecError, Dimensions};
use image::DynamicImage;
use std::path::Path;

/// Parse the AVIF container of `path`.
fn read_container(path: &Path) -> Result<avif_parse::AvifData, CodecError> {
    let file_data = std::fs::read(path).map_err(CodecError::Io)?;
    avif_parse::read_avif(&mut std::io::Cursor::new(&file_data)).map_err(|e| {
        CodecError::Decode(format!("Failed to parse AVIF {}: {e:?}", path.display()))
    })
}

/// Dimensions from the container metadata, no AV1 decode.
pub fn identify(path: &Path) -> Result<Dimensions, CodecError> {
    let container = read_container(path)?;
    let meta = container.primary_item_metadata().map_err(|e| {
        CodecError::Decode(format!(
            "Failed to read AVIF metadata {}: {e:?}",
            path.display()
        ))
    })?;
    Ok(Dimensions {
        width: meta.max_frame_width.get(),
        height: meta.max_frame_height.get(),
    })
}

/// Decode an AVIF file to RGB8.
pub fn decode(path: &Path) -> Result<DynamicImage, CodecError> {
    let container = read_container(path)?;
    let (width, height, rgb) = decode_av1_frame(&container.primary_item)?;
    image::RgbImage::from_raw(width, height, rgb)
        .map(DynamicImage::ImageRgb8)
        .ok_or_else(|| {
            CodecError::Decode(format!(
                "Decoded AVIF payload of {} has inconsistent dimensions",
                path.display()
            ))
        })
}

/// Run the AV1 payload through rav1d and return `(width, height, rgb8)`.
fn decode_av1_frame(av1_bytes: &[u8]) -> Result<(u32, u32, Vec<u8>), CodecError> {
    use rav1d::include::dav1d::data::Dav1dData;
    use rav1d::include::dav1d::dav1d::Dav1dSettings;
    use rav1d::include::dav1d::picture::Dav1dPicture;
    use std::ptr::NonNull;

    let decode_err = |msg: String| CodecError::Decode(format!("AVIF decode: {msg}"));

    // Single-frame still image: one thread, no frame delay.
    let mut settings = std::mem::MaybeUninit::<Dav1dSettings>::uninit();
    unsafe {
        rav1d::src::lib::dav1d_default_settings(NonNull::new(settings.as_mut_ptr()).unwrap())
    };
    let mut settings = unsafe { settings.assume_init() };
    settings.n_threads = 1;
    settings.max_frame_delay = 1;

    let mut ctx = None;
    let rc =
        unsafe { rav1d::src::lib::dav1d_open(NonNull::new(&mut ctx), NonNull::new(&mut settings)) };
    if rc.0 != 0 {
        return Err(decode_err(format!("open failed ({})", rc.0)));
    }

    let mut data = Dav1dData::default();
    let buf_ptr =
        unsafe { rav1d::src::lib::dav1d_data_create(NonNull::new(&mut data), av1_bytes.len()) };
    if buf_ptr.is_null() {
        unsafe { rav1d::src::lib::dav1d_close(NonNull::new(&mut ctx)) };
        return Err(decode_err("data_create failed".into()));
    }
    unsafe { std::ptr::copy_nonoverlapping(av1_bytes.as_ptr(), buf_ptr, av1_bytes.len()) };

    let rc = unsafe { rav1d::src::lib::dav1d_send_data(ctx, NonNull::new(&mut data)) };
    if rc.0 != 0 {
        unsafe {
            rav1d::src::lib::dav1d_data_unref(NonNull::new(&mut data));
            rav1d::src::lib::dav1d_close(NonNull::new(&mut ctx));
        }
        return Err(decode_err(format!("send_data failed ({})", rc.0)));
    }

    let mut pic: Dav1dPicture = unsafe { std::mem::zeroed() };
    let rc = unsafe { rav1d::src::lib::dav1d_get_picture(ctx, NonNull::new(&mut pic)) };
    if rc.0 != 0 {
        unsafe { rav1d::src::lib::dav1d_close(NonNull::new(&mut ctx)) };
        return Err(decode_err(format!("get_picture failed ({})", rc.0)));
    }

    let result = picture_to_rgb(&pic);

    unsafe {
        rav1d::src::lib::dav1d_picture_unref(NonNull::new(&mut pic));
        rav1d::src::lib::dav1d_close(NonNull::new(&mut ctx));
    }

    result
}

/// Convert a decoded picture's YUV planes to interleaved RGB8.
fn picture_to_rgb(
    pic: &rav1d::include::dav1d::picture::Dav1dPicture,
) -> Result<(u32, u32, Vec<u8>), CodecError> {
    use rav1d::include::dav1d::headers::{
        DAV1D_PIXEL_LAYOUT_I400, DAV1D_PIXEL_LAYOUT_I420, DAV1D_PIXEL_LAYOUT_I422,
        DAV1D_PIXEL_LAYOUT_I444,
    };

    let width = pic.p.w as u32;
    let height = pic.p.h as u32;
    let bpc = pic.p.bpc as u32;
    let layout = pic.p.layout;
    let y_stride = pic.stride[0];
    let uv_stride = pic.stride[1];
    let y_ptr = pic.data[0]
        .ok_or_else(|| CodecError::Decode("AVIF decode: missing luma plane".into()))?
        .as_ptr() as *const u8;

    // Sample scaling: map the source bit depth down to 8 bits.
    let max_val = ((1u32 << bpc) - 1) as f32;
    let center = (1u32 << (bpc - 1)) as f32;
    let scale = 255.0 / max_val;

    let monochrome = layout == DAV1D_PIXEL_LAYOUT_I400;
    let (u_ptr, v_ptr, ss_x, ss_y) = if monochrome {
        (y_ptr, y_ptr, false, false)
    } else {
        let u = pic.data[1]
            .ok_or_else(|| CodecError::Decode("AVIF decode: missing chroma plane".into()))?
            .as_ptr() as *const u8;
        let v = pic.data[2]
            .ok_or_else(|| CodecError::Decode("AVIF decode: missing chroma plane".into()))?
            .as_ptr() as *const u8;
        // Chroma subsampling: horizontal, vertical.
        let (ss_x, ss_y) = match layout {
            DAV1D_PIXEL_LAYOUT_I420 => (true, true),
            DAV1D_PIXEL_LAYOUT_I422 => (true, false),
            DAV1D_PIXEL_LAYOUT_I444 => (false, false),
            _ => {
                return Err(CodecError::Decode(format!(
                    "AVIF decode: unsupported pixel layout {layout}"
                )));
            }
        };
        (u, v, ss_x, ss_y)
    };

    let mut rgb = vec![0u8; (width * height * 3) as usize];
    for row in 0..height {
        for col in 0..width {
            let y_val = read_sample(y_ptr, y_stride, col, row, bpc);

            let (r, g, b) = if monochrome {
                let v = (y_val * scale).clamp(0.0, 255.0);
                (v, v, v)
            } else {
                let u_col = if ss_x { col / 2 } else { col };
                let u_row = if ss_y { row / 2 } else { row };
                let cb = read_sample(u_ptr, uv_stride, u_col, u_row, bpc) - center;
                let cr = read_sample(v_ptr, uv_stride, u_col, u_row, bpc) - center;

                // BT.601 YCbCr → RGB, then scale to 8-bit.
                (
                    ((y_val + 1.402 * cr) * scale).clamp(0.0, 255.0),
                    ((y_val - 0.344136 * cb - 0.714136 * cr) * scale).clamp(0.0, 255.0),
                    ((y_val + 1.772 * cb) * scale).clamp(0.0, 255.0),
                )
            };

            let idx = ((row * width + col) * 3) as usize;
            rgb[idx] = r as u8;
            rgb[idx + 1] = g as u8;
            rgb[idx + 2] = b as u8;
        }
    }

    Ok((width, height, rgb))
}

/// Read one sample from a plane, handling 8-bit and 16-bit storage.
#[inline]
fn read_sample(ptr: *const u8, stride: isize, x: u32, y: u32, bpc: u32) -> f32 {
    if bpc <= 8 {
        (unsafe { *ptr.offset(y as isize * stride + x as isize) }) as f32
    } else {
        // 10-bit and 12-bit samples are stored as u16
        let byte_offset = y as isize * stride + x as isize * 2;
        (unsafe { *(ptr.offset(byte_offset) as *const u16) }) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::avif::AvifEncoder;

    /// Encode a synthetic gradient to AVIF through our own encoder path.
    fn create_test_avif(path: &Path, width: u32, height: u32) {
        let img = image::RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        let file = std::fs::File::create(path).unwrap();
        let writer = std::io::BufWriter::new(file);
        let encoder = AvifEncoder::new_with_speed_quality(writer, 8, 85);
        DynamicImage::ImageRgb8(img)
            .write_with_encoder(encoder)
            .unwrap();
    }

    #[test]
    fn identify_reads_container_dimensions() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("test.avif");
        create_test_avif(&path, 120, 80);

        let dims = identify(&path).unwrap();
        assert_eq!((dims.width, dims.height), (120, 80));
    }

    #[test]
    fn decode_roundtrip() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("test.avif");
        create_test_avif(&path, 64, 48);

        let decoded = decode(&path).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 48));
    }

    #[test]
    fn identify_rejects_non_avif_bytes() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("bogus.avif");
        std::fs::write(&path, b"not an avif container").unwrap();

        assert!(matches!(identify(&path), Err(CodecError::Decode(_))));
    }
}
