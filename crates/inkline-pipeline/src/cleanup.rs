//! Morphological cleanup: despeckle and closing.
//!
//! Both rules are evaluated for every pixel against `previous`, the
//! frozen mask produced by thresholding, and the results are written to
//! a separate `next` mask. No rule ever reads a partially rewritten
//! mask, so the outcome does not depend on traversal order or on how
//! rows are split across threads.

use crate::rows::fill_rows;
use crate::types::EdgeMask;

/// Apply despeckle and closing in one pass.
///
/// For each pixel, count the edge pixels among its 8 in-bounds
/// neighbours in `previous`:
///
/// - an edge with fewer than `despeckle_min` edge neighbours becomes
///   background;
/// - a background pixel with at least `close_min` edge neighbours
///   becomes an edge;
/// - every other pixel keeps its value.
#[must_use = "returns the cleaned mask"]
pub fn clean(previous: &EdgeMask, despeckle_min: u8, close_min: u8) -> EdgeMask {
    let mut next = EdgeMask::new(previous.width(), previous.height());
    let width = previous.width() as usize;
    fill_rows(next.as_mut_slice(), width, |y, row| {
        for (x, cell) in row.iter_mut().enumerate() {
            let neighbors = previous.neighbors_at(x, y);
            *cell = if previous.at(x, y) {
                neighbors >= despeckle_min
            } else {
                neighbors >= close_min
            };
        }
    });
    next
}
