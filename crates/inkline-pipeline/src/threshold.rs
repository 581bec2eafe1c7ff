//! Gradient magnitude to binary edge mask.

use crate::rows::fill_rows;
use crate::types::{EdgeMask, GradientField};

/// Mark every pixel whose magnitude is strictly greater than
/// `threshold` as an edge.
///
/// Monotonic: raising `threshold` can only remove edges.
#[must_use = "returns the edge mask"]
pub fn binarize(gradient: &GradientField, threshold: f32) -> EdgeMask {
    let (w, h) = gradient.dimensions();
    let width = w as usize;
    let src = gradient.as_raw();
    let mut mask = EdgeMask::new(w, h);
    fill_rows(mask.as_mut_slice(), width, |y, row| {
        let line = &src[y * width..(y + 1) * width];
        for (cell, &magnitude) in row.iter_mut().zip(line) {
            *cell = magnitude > threshold;
        }
    });
    mask
}
