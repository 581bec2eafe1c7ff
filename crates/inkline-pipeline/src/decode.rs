//! Image decoding and raster surface checks.
//!
//! Accepts raw image bytes (PNG, JPEG, BMP, WebP, GIF) and produces the
//! RGBA8 source buffer, then verifies that the working buffers for an
//! image of that size can actually be allocated before any filter runs.

use std::io::Cursor;

use image::{ImageError, ImageReader, Limits, RgbaImage};

use crate::types::PipelineError;

/// Largest accepted source image, in pixels (16384 x 16384).
pub const MAX_SURFACE_PIXELS: u64 = 1 << 28;

/// Decode raw image bytes into an RGBA8 buffer.
///
/// The format is guessed from the data, not from a file name or MIME
/// type. Decoding runs under the `image` crate's default allocation
/// limits.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty.
/// Returns [`PipelineError::Context`] if the decoder would exceed its
/// allocation limits.
/// Returns [`PipelineError::ImageDecode`] if the format is unrecognized
/// or the data is corrupt.
pub fn decode(bytes: &[u8]) -> Result<RgbaImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let mut reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| PipelineError::ImageDecode(ImageError::IoError(e)))?;
    reader.limits(Limits::default());

    let image = reader.decode().map_err(|e| match e {
        ImageError::Limits(limit) => PipelineError::Context(limit.to_string()),
        other => PipelineError::ImageDecode(other),
    })?;
    Ok(image.into_rgba8())
}

/// Verify that an image of `width x height` can be processed.
///
/// Returns the pixel count on success. The largest working buffer (one
/// `f32` per pixel) is reserved once as an allocation probe and then
/// released.
///
/// # Errors
///
/// Returns [`PipelineError::DegenerateInput`] if either dimension is
/// zero.
/// Returns [`PipelineError::Context`] if the pixel count exceeds
/// [`MAX_SURFACE_PIXELS`] or the probe allocation fails.
pub fn check_surface(width: u32, height: u32) -> Result<usize, PipelineError> {
    if width == 0 || height == 0 {
        return Err(PipelineError::DegenerateInput { width, height });
    }

    let pixels = u64::from(width) * u64::from(height);
    if pixels > MAX_SURFACE_PIXELS {
        return Err(PipelineError::Context(format!(
            "{width}x{height} exceeds the {MAX_SURFACE_PIXELS} pixel limit"
        )));
    }
    let len = usize::try_from(pixels).map_err(|_| {
        PipelineError::Context(format!("{width}x{height} does not fit in memory"))
    })?;

    let mut probe: Vec<f32> = Vec::new();
    probe.try_reserve_exact(len).map_err(|e| {
        PipelineError::Context(format!("{width}x{height} working buffer: {e}"))
    })?;
    Ok(len)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Helper: encode an RGBA image as PNG bytes.
    fn encode_png(img: &RgbaImage) -> Vec<u8> {
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgba8,
        )
        .unwrap();
        buf
    }

    /// Helper: a 32-bit BMP header declaring `side x side` pixels with
    /// no pixel data.
    fn bmp_header(side: i32) -> Vec<u8> {
        let mut bmp = Vec::with_capacity(54);
        bmp.extend_from_slice(b"BM");
        for v in [54u32, 0, 54, 40] {
            bmp.extend_from_slice(&v.to_le_bytes());
        }
        bmp.extend_from_slice(&side.to_le_bytes());
        bmp.extend_from_slice(&side.to_le_bytes());
        bmp.extend_from_slice(&1u16.to_le_bytes());
        bmp.extend_from_slice(&32u16.to_le_bytes());
        for v in [0u32, 0, 2835, 2835, 0, 0] {
            bmp.extend_from_slice(&v.to_le_bytes());
        }
        bmp
    }

    #[test]
    fn decoder_allocation_limit_is_a_context_error() {
        let result = decode(&bmp_header(20_000));
        assert!(
            matches!(result, Err(PipelineError::Context(_))),
            "got {result:?}"
        );
    }

    #[test]
    fn empty_input_returns_error() {
        let result = decode(&[]);
        assert!(matches!(result, Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn corrupt_bytes_returns_image_decode_error() {
        let result = decode(&[0xFF, 0xFE, 0x00, 0x01]);
        assert!(matches!(result, Err(PipelineError::ImageDecode(_))));
    }

    #[test]
    fn text_is_not_an_image() {
        let result = decode(b"<html><body>not found</body></html>");
        assert!(matches!(result, Err(PipelineError::ImageDecode(_))));
    }

    #[test]
    fn valid_png_round_trips_pixels() {
        let img = RgbaImage::from_fn(3, 2, |x, y| {
            image::Rgba([u8::try_from(x * 50).unwrap(), u8::try_from(y * 90).unwrap(), 7, 200])
        });
        let decoded = decode(&encode_png(&img)).unwrap();
        assert_eq!(decoded, img);
    }

    #[test]
    fn output_dimensions_match_input() {
        let img = RgbaImage::from_fn(17, 31, |_, _| image::Rgba([128, 64, 32, 255]));
        let decoded = decode(&encode_png(&img)).unwrap();
        assert_eq!(decoded.dimensions(), (17, 31));
    }

    #[test]
    fn zero_width_is_degenerate() {
        assert!(matches!(
            check_surface(0, 10),
            Err(PipelineError::DegenerateInput {
                width: 0,
                height: 10
            })
        ));
    }

    #[test]
    fn zero_height_is_degenerate() {
        assert!(matches!(
            check_surface(10, 0),
            Err(PipelineError::DegenerateInput { .. })
        ));
    }

    #[test]
    fn oversized_surface_is_a_context_error() {
        let result = check_surface(u32::MAX, u32::MAX);
        assert!(matches!(result, Err(PipelineError::Context(_))));
    }

    #[test]
    fn small_surface_reports_pixel_count() {
        assert_eq!(check_surface(4, 4).unwrap(), 16);
    }
}
