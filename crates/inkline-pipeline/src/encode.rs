//! Edge mask to transparent line-art PNG.

use image::ImageEncoder;

use crate::rows::fill_rows;
use crate::types::{EdgeMask, OutputArtifact, PipelineError, RgbaImage};

/// Opaque black: the colour of every edge pixel.
pub const INK: [u8; 4] = [0, 0, 0, 255];

/// Fully transparent: the colour of every background pixel.
///
/// Colour channels are white so viewers that ignore alpha still show a
/// blank page.
pub const PAPER: [u8; 4] = [255, 255, 255, 0];

/// Paint the mask: [`INK`] where an edge is set, [`PAPER`] elsewhere.
#[must_use = "returns the rendered image"]
pub fn to_rgba(mask: &EdgeMask) -> RgbaImage {
    let width = mask.width() as usize;
    let cells = mask.as_slice();
    let mut rgba = RgbaImage::new(mask.width(), mask.height());
    let buf: &mut [u8] = &mut rgba;
    fill_rows(buf, width * 4, |y, row| {
        let line = &cells[y * width..(y + 1) * width];
        for (px, &edge) in row.chunks_exact_mut(4).zip(line) {
            px.copy_from_slice(if edge { &INK } else { &PAPER });
        }
    });
    rgba
}

/// PNG-encode an RGBA8 image.
///
/// # Errors
///
/// Returns [`PipelineError::Encode`] if the PNG encoder fails.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, PipelineError> {
    let mut png = Vec::new();
    image::codecs::png::PngEncoder::new(&mut png)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ExtendedColorType::Rgba8,
        )
        .map_err(|e| PipelineError::Encode(e.to_string()))?;
    Ok(png)
}

/// Render the mask and encode it into the final artifact.
///
/// # Errors
///
/// Returns [`PipelineError::Encode`] if PNG encoding fails.
pub fn encode(mask: &EdgeMask) -> Result<OutputArtifact, PipelineError> {
    let rgba = to_rgba(mask);
    let png = encode_png(&rgba)?;
    Ok(OutputArtifact {
        dimensions: mask.dimensions(),
        rgba,
        png,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn edges_are_opaque_black_background_transparent() {
        let mut mask = EdgeMask::new(3, 2);
        mask.set(1, 0, true);
        mask.set(2, 1, true);
        let rgba = to_rgba(&mask);
        assert_eq!(rgba.get_pixel(1, 0).0, INK);
        assert_eq!(rgba.get_pixel(2, 1).0, INK);
        assert_eq!(rgba.get_pixel(0, 0).0, PAPER);
        assert_eq!(rgba.get_pixel(0, 1).0[3], 0);
    }

    #[test]
    fn only_two_pixel_values_are_emitted() {
        let mask = EdgeMask::from_fn(7, 5, |x, y| (x * 3 + y) % 4 == 0);
        let rgba = to_rgba(&mask);
        assert!(rgba.pixels().all(|p| p.0 == INK || p.0 == PAPER));
    }

    #[test]
    fn png_decodes_to_same_pixels() {
        let mask = EdgeMask::from_fn(6, 4, |x, y| x == y);
        let artifact = encode(&mask).unwrap();
        assert_eq!(artifact.dimensions, mask.dimensions());
        assert!(artifact.png.starts_with(b"\x89PNG"));

        let decoded = image::load_from_memory(&artifact.png).unwrap().into_rgba8();
        assert_eq!(decoded, artifact.rgba);
    }

    #[test]
    fn empty_mask_is_fully_transparent() {
        let artifact = encode(&EdgeMask::new(4, 4)).unwrap();
        assert!(artifact.rgba.pixels().all(|p| p.0[3] == 0));
    }
}
