//! Separable Gaussian blur for noise reduction before gradient
//! estimation.
//!
//! The 2-D blur is applied as a horizontal 1-D pass followed by a
//! vertical one, each writing a fresh buffer. Neighbours outside the
//! image are clamped to the nearest valid pixel (edge replicate), so a
//! uniform image stays uniform right up to its border.

use crate::rows::fill_rows;
use crate::types::IntensityField;

/// Build a normalized 1-D Gaussian kernel of `2 * radius + 1` taps.
///
/// `sigma = radius / 2` and each weight is `exp(-x^2 / (2 sigma^2))`
/// before normalization. A radius of zero yields the identity kernel
/// `[1.0]`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn gaussian_kernel(radius: u32) -> Vec<f32> {
    if radius == 0 {
        return vec![1.0];
    }

    let sigma = radius as f32 / 2.0;
    let two_sigma_sq = 2.0 * sigma * sigma;
    let r = i64::from(radius);
    let weights: Vec<f32> = (-r..=r)
        .map(|x| {
            let x = x as f32;
            (-(x * x) / two_sigma_sq).exp()
        })
        .collect();
    let sum: f32 = weights.iter().sum();
    weights.into_iter().map(|w| w / sum).collect()
}

/// Blur an intensity field with a Gaussian of the given radius.
///
/// The input is left untouched; a new field is returned.
#[must_use = "returns the blurred field"]
pub fn gaussian_blur(field: &IntensityField, radius: u32) -> IntensityField {
    let kernel = gaussian_kernel(radius);
    let horizontal = horizontal_pass(field, &kernel);
    vertical_pass(&horizontal, &kernel)
}

/// Index of the tap `k` of a kernel centred on `pos`, clamped to
/// `0..len`.
const fn clamped(pos: usize, k: usize, radius: usize, len: usize) -> usize {
    let i = (pos + k).saturating_sub(radius);
    if i >= len { len - 1 } else { i }
}

fn horizontal_pass(field: &IntensityField, kernel: &[f32]) -> IntensityField {
    let (w, h) = field.dimensions();
    let width = w as usize;
    let radius = kernel.len() / 2;
    let src = field.as_raw();
    let mut out = IntensityField::new(w, h);
    let buf: &mut [f32] = &mut out;
    fill_rows(buf, width, |y, row| {
        let line = &src[y * width..(y + 1) * width];
        for (x, cell) in row.iter_mut().enumerate() {
            *cell = kernel
                .iter()
                .enumerate()
                .map(|(k, weight)| weight * line[clamped(x, k, radius, width)])
                .sum();
        }
    });
    out
}

fn vertical_pass(field: &IntensityField, kernel: &[f32]) -> IntensityField {
    let (w, h) = field.dimensions();
    let (width, height) = (w as usize, h as usize);
    let radius = kernel.len() / 2;
    let src = field.as_raw();
    let mut out = IntensityField::new(w, h);
    let buf: &mut [f32] = &mut out;
    fill_rows(buf, width, |y, row| {
        for (x, cell) in row.iter_mut().enumerate() {
            *cell = kernel
                .iter()
                .enumerate()
                .map(|(k, weight)| weight * src[clamped(y, k, radius, height) * width + x])
                .sum();
        }
    });
    out
}
