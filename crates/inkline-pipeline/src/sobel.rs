//! Sobel gradient magnitude.
//!
//! Only interior pixels (`1 <= x < width - 1`, `1 <= y < height - 1`)
//! are evaluated; the one-pixel border ring keeps magnitude zero.
//! Neighbourhood reads go through [`Neighborhood::sample_or_zero`],
//! which returns 0 outside the image. This is deliberately different
//! from the blur's clamped sampling and must stay that way.

use crate::rows::fill_rows;
use crate::types::{GradientField, IntensityField};

/// Read-only 3x3 sampler over a row-major `f32` buffer.
struct Neighborhood<'a> {
    data: &'a [f32],
    width: usize,
    height: usize,
}

impl Neighborhood<'_> {
    /// Value at `(x + dx, y + dy)`, or 0 when that lies outside the image.
    fn sample_or_zero(&self, x: usize, y: usize, dx: isize, dy: isize) -> f32 {
        match (x.checked_add_signed(dx), y.checked_add_signed(dy)) {
            (Some(sx), Some(sy)) if sx < self.width && sy < self.height => {
                self.data[sy * self.width + sx]
            }
            _ => 0.0,
        }
    }

    /// Horizontal and vertical Sobel responses at `(x, y)`.
    fn gradient(&self, x: usize, y: usize) -> (f32, f32) {
        let p = |dx, dy| self.sample_or_zero(x, y, dx, dy);

        let gx = -p(-1, -1) + p(1, -1) - 2.0 * p(-1, 0) + 2.0 * p(1, 0) - p(-1, 1) + p(1, 1);
        let gy = -p(-1, -1) - 2.0 * p(0, -1) - p(1, -1) + p(-1, 1) + 2.0 * p(0, 1) + p(1, 1);
        (gx, gy)
    }
}

/// Compute `sqrt(gx^2 + gy^2)` for every interior pixel of `field`.
///
/// Images narrower or shorter than 3 pixels have no interior and yield
/// an all-zero field.
#[must_use = "returns the gradient magnitude field"]
pub fn gradient_magnitude(field: &IntensityField) -> GradientField {
    let (w, h) = field.dimensions();
    let (width, height) = (w as usize, h as usize);
    let sampler = Neighborhood {
        data: field.as_raw(),
        width,
        height,
    };
    let mut out = GradientField::new(w, h);
    let buf: &mut [f32] = &mut out;
    fill_rows(buf, width, |y, row| {
        if y == 0 || y + 1 >= height {
            return;
        }
        for x in 1..width.saturating_sub(1) {
            let (gx, gy) = sampler.gradient(x, y);
            row[x] = gx.hypot(gy);
        }
    });
    out
}
