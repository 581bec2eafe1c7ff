//! RGBA to single-channel luma conversion.
//!
//! Uses the Rec. 601 weights `0.299*R + 0.587*G + 0.114*B` in `f32`.
//! Alpha is ignored, so a transparent pixel contributes its colour
//! channels exactly like an opaque one.

use image::RgbaImage;

use crate::rows::fill_rows;
use crate::types::IntensityField;

/// Red channel weight.
pub const WEIGHT_R: f32 = 0.299;
/// Green channel weight.
pub const WEIGHT_G: f32 = 0.587;
/// Blue channel weight.
pub const WEIGHT_B: f32 = 0.114;

/// Luma of one RGB triple.
#[must_use]
pub fn luma(r: u8, g: u8, b: u8) -> f32 {
    WEIGHT_B.mul_add(
        f32::from(b),
        WEIGHT_G.mul_add(f32::from(g), WEIGHT_R * f32::from(r)),
    )
}

/// Convert every pixel of `image` to its luma intensity.
#[must_use = "returns the intensity field"]
pub fn extract(image: &RgbaImage) -> IntensityField {
    let (w, h) = image.dimensions();
    let src = image.as_raw();
    let row_len = w as usize;
    let mut field = IntensityField::new(w, h);
    let out: &mut [f32] = &mut field;
    fill_rows(out, row_len, |y, row| {
        let start = y * row_len * 4;
        let pixels = &src[start..start + row_len * 4];
        for (cell, px) in row.iter_mut().zip(pixels.chunks_exact(4)) {
            *cell = luma(px[0], px[1], px[2]);
        }
    });
    field
}
