//! Row and pixel iteration helpers.
//!
//! With the `parallel` feature these fan out over rayon's global pool; without
//! it (wasm builds) they run on the calling thread. Callers never depend on
//! the visiting order.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Visit each row of `data` (rows of `row_len` samples) with its index.
#[cfg(feature = "parallel")]
pub(crate) fn for_each_row<F>(data: &mut [f32], row_len: usize, f: F)
where
    F: Fn(usize, &mut [f32]) + Send + Sync,
{
    data.par_chunks_mut(row_len)
        .enumerate()
        .for_each(|(y, row)| f(y, row));
}

#[cfg(not(feature = "parallel"))]
pub(crate) fn for_each_row<F>(data: &mut [f32], row_len: usize, f: F)
where
    F: Fn(usize, &mut [f32]) + Send + Sync,
{
    data.chunks_mut(row_len)
        .enumerate()
        .for_each(|(y, row)| f(y, row));
}

/// Visit each RGBA pixel of `data` with its linear index.
#[cfg(feature = "parallel")]
pub(crate) fn for_each_pixel<F>(data: &mut [f32], f: F)
where
    F: Fn(usize, &mut [f32]) + Send + Sync,
{
    data.par_chunks_exact_mut(4)
        .enumerate()
        .for_each(|(k, px)| f(k, px));
}

#[cfg(not(feature = "parallel"))]
pub(crate) fn for_each_pixel<F>(data: &mut [f32], f: F)
where
    F: Fn(usize, &mut [f32]) + Send + Sync,
{
    data.chunks_exact_mut(4)
        .enumerate()
        .for_each(|(k, px)| f(k, px));
}

/// Map a batch of indices concurrently, keeping results in index order.
#[cfg(feature = "parallel")]
pub(crate) fn map_indices<T, F>(indices: std::ops::Range<usize>, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Send + Sync,
{
    indices.into_par_iter().map(f).collect()
}

#[cfg(not(feature = "parallel"))]
pub(crate) fn map_indices<T, F>(indices: std::ops::Range<usize>, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Send + Sync,
{
    indices.map(f).collect()
}

/// Number of independent jobs worth running at once.
#[cfg(feature = "parallel")]
pub(crate) fn worker_count() -> usize {
    rayon::current_num_threads().max(1)
}

#[cfg(not(feature = "parallel"))]
pub(crate) fn worker_count() -> usize {
    1
}
