//! Row-wise output filling shared by every per-pixel stage.
//!
//! Each stage computes an output row purely from an immutable input
//! buffer, so rows can be filled in any order. With the `parallel`
//! feature the rows are distributed over the rayon thread pool;
//! otherwise they are filled sequentially. The result is identical.

/// Fill `out` one row at a time.
///
/// `out` is split into consecutive chunks of `row_len` elements and
/// `fill` is called with the row index and the mutable row. A trailing
/// partial chunk is passed as-is. Does nothing when `row_len` is zero.
pub(crate) fn fill_rows<T, F>(out: &mut [T], row_len: usize, fill: F)
where
    T: Send,
    F: Fn(usize, &mut [T]) + Send + Sync,
{
    if row_len == 0 {
        return;
    }

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        out.par_chunks_mut(row_len)
            .enumerate()
            .for_each(|(y, row)| fill(y, row));
    }

    #[cfg(not(feature = "parallel"))]
    {
        out.chunks_mut(row_len)
            .enumerate()
            .for_each(|(y, row)| fill(y, row));
    }
}
