//! Gaussian / Laplacian pyramids.
//!
//! All filtering uses the separable 5-tap binomial kernel
//! `(1, 4, 6, 4, 1) / 16` with reflect-101 borders: indices past an edge
//! reflect about the edge sample without repeating it (`-1 -> 1`,
//! `n -> n - 2`). The reflection keeps index parity, so blurring a
//! zero-stuffed buffer reproduces constants exactly.
//!
//! # Level sizes
//!
//! A level of `n` pixels reduces to `(n - 1) / 2 + 1`, keeping every even
//! sample. Expanding back places the coarse samples (times 4) on even
//! positions, zeros elsewhere, and blurs. Single-pixel axes are not thinned
//! and drop their factor of 2.

use crate::buffer::{BufferError, PixelBuffer, CHANNELS};
use crate::parallel;

/// Maximum pyramid depth.
pub const MAX_LEVELS: usize = 8;

/// Levels narrower or shorter than this are not built.
const MIN_LEVEL_DIM: usize = 4;

/// Reference radius (in full-resolution pixels) the coarsest level spans.
const BASE_RADIUS: f32 = 256.0;

const KERNEL: [f32; 5] = [1.0 / 16.0, 4.0 / 16.0, 6.0 / 16.0, 4.0 / 16.0, 1.0 / 16.0];

/// Reflect `i` into `0..n` without repeating the edge sample.
#[inline]
pub fn mirror(i: isize, n: usize) -> usize {
    if n <= 1 {
        return 0;
    }
    let period = 2 * (n as isize - 1);
    let i = i.rem_euclid(period);
    if i >= n as isize {
        (period - i) as usize
    } else {
        i as usize
    }
}

/// Size of the next coarser level.
#[inline]
pub fn coarse_dim(n: usize) -> usize {
    n.saturating_sub(1) / 2 + 1
}

/// Number of pyramid levels for an image of `width` x `height`.
///
/// The coarsest level should cover roughly 256 pixels at full resolution, so
/// `radius = min(width, ceil(256 * scale / inverse_scale))`. Starting with
/// `step = 1`, each level halves the size and doubles the step; building
/// stops once the step exceeds the radius or the next level would be smaller
/// than 4 pixels on either side. Capped at [`MAX_LEVELS`], so a 4x4 image
/// gets a single level and a full-scale 4096x4096 image gets all eight.
pub fn level_count(width: usize, height: usize, scale: f32, inverse_scale: f32) -> usize {
    let radius = (width as f32).min((BASE_RADIUS * scale / inverse_scale).ceil());
    let (mut w, mut h) = (width, height);
    let mut step = 1usize;
    for k in 0..MAX_LEVELS {
        w = coarse_dim(w);
        h = coarse_dim(h);
        step *= 2;
        if step as f32 > radius || w < MIN_LEVEL_DIM || h < MIN_LEVEL_DIM {
            return k + 1;
        }
    }
    MAX_LEVELS
}

/// Blur `input` into `output` (same dimensions).
pub fn blur_into(input: &PixelBuffer, output: &mut PixelBuffer) -> Result<(), BufferError> {
    input.ensure_same_size(output)?;
    let (width, height) = (input.width(), input.height());
    let row_len = input.row_len();
    let src = input.as_slice();

    // Horizontal pass
    let mut tmp = input.zeroed_like()?;
    parallel::for_each_row(tmp.as_mut_slice(), row_len, |y, row| {
        let line = &src[y * row_len..(y + 1) * row_len];
        for (x, px) in row.chunks_exact_mut(CHANNELS).enumerate() {
            for (t, w) in KERNEL.iter().enumerate() {
                let sx = mirror(x as isize + t as isize - 2, width) * CHANNELS;
                for (p, s) in px.iter_mut().zip(&line[sx..sx + CHANNELS]) {
                    *p += s * w;
                }
            }
        }
    });

    // Vertical pass
    let horizontal = tmp.as_slice();
    parallel::for_each_row(output.as_mut_slice(), row_len, |y, row| {
        row.fill(0.0);
        for (t, w) in KERNEL.iter().enumerate() {
            let sy = mirror(y as isize + t as isize - 2, height);
            let line = &horizontal[sy * row_len..(sy + 1) * row_len];
            for (o, s) in row.iter_mut().zip(line) {
                *o += s * w;
            }
        }
    });
    Ok(())
}

/// Blur into a newly allocated buffer.
pub fn blur(input: &PixelBuffer) -> Result<PixelBuffer, BufferError> {
    let mut output = input.zeroed_like()?;
    blur_into(input, &mut output)?;
    Ok(output)
}

/// Blur and keep every second row and column.
pub fn reduce(input: &PixelBuffer) -> Result<PixelBuffer, BufferError> {
    let blurred = blur(input)?;
    let mut coarse =
        PixelBuffer::try_zeroed(coarse_dim(input.width()), coarse_dim(input.height()))?;
    let fine_row = blurred.row_len();
    let coarse_row = coarse.row_len();
    let src = blurred.as_slice();
    parallel::for_each_row(coarse.as_mut_slice(), coarse_row, |y, row| {
        let line = &src[2 * y * fine_row..(2 * y + 1) * fine_row];
        for (px, fine) in row
            .chunks_exact_mut(CHANNELS)
            .zip(line.chunks_exact(CHANNELS).step_by(2))
        {
            px.copy_from_slice(fine);
        }
    });
    Ok(coarse)
}

/// Upsample `coarse` to `width` x `height`.
///
/// # Errors
/// `BufferError::SizeMismatch` unless `coarse` is exactly one level below the
/// requested size.
pub fn expand(coarse: &PixelBuffer, width: usize, height: usize) -> Result<PixelBuffer, BufferError> {
    let mut fine = PixelBuffer::try_zeroed(width, height)?;
    let (cw, ch) = (coarse_dim(width), coarse_dim(height));
    if coarse.width() != cw || coarse.height() != ch {
        return Err(BufferError::SizeMismatch {
            expected: cw * ch * CHANNELS,
            got: coarse.as_slice().len(),
        });
    }

    // Zero-stuffing thins each axis of length > 1 by half
    let gain_x = if width > 1 { 2.0 } else { 1.0 };
    let gain_y = if height > 1 { 2.0 } else { 1.0 };
    let gain = gain_x * gain_y;
    let coarse_row = coarse.row_len();
    let fine_row = fine.row_len();
    let src = coarse.as_slice();
    parallel::for_each_row(fine.as_mut_slice(), fine_row, |y, row| {
        if y % 2 != 0 {
            return;
        }
        let line = &src[(y / 2) * coarse_row..(y / 2 + 1) * coarse_row];
        for (px, c) in row
            .chunks_exact_mut(CHANNELS)
            .step_by(2)
            .zip(line.chunks_exact(CHANNELS))
        {
            for (p, v) in px.iter_mut().zip(c) {
                *p = gain * v;
            }
        }
    });
    blur(&fine)
}

/// Laplacian layer: `fine - expand(coarse)`.
pub fn laplacian(fine: &PixelBuffer, coarse: &PixelBuffer) -> Result<PixelBuffer, BufferError> {
    let mut detail = expand(coarse, fine.width(), fine.height())?;
    let row_len = fine.row_len();
    let src = fine.as_slice();
    parallel::for_each_row(detail.as_mut_slice(), row_len, |y, row| {
        let line = &src[y * row_len..(y + 1) * row_len];
        for (d, s) in row.iter_mut().zip(line) {
            *d = s - *d;
        }
    });
    Ok(detail)
}

/// Reduce and also return the detail lost by doing so.
///
/// `expand(coarse) + detail` reproduces `input`.
pub fn reduce_with_detail(input: &PixelBuffer) -> Result<(PixelBuffer, PixelBuffer), BufferError> {
    let coarse = reduce(input)?;
    let detail = laplacian(input, &coarse)?;
    Ok((coarse, detail))
}

/// Gaussian pyramid, level 0 at full resolution.
#[derive(Debug, Clone)]
pub struct GaussianPyramid {
    levels: Vec<PixelBuffer>,
}

impl GaussianPyramid {
    /// Build `levels` levels (clamped to `1..=MAX_LEVELS`) from `base`.
    pub fn build(base: PixelBuffer, levels: usize) -> Result<Self, BufferError> {
        let levels = levels.clamp(1, MAX_LEVELS);
        let mut out = Vec::with_capacity(levels);
        out.push(base);
        while out.len() < levels {
            let next = reduce(&out[out.len() - 1])?;
            out.push(next);
        }
        Ok(Self { levels: out })
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Always false; a pyramid holds at least its base.
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn level(&self, k: usize) -> Option<&PixelBuffer> {
        self.levels.get(k)
    }

    pub fn levels(&self) -> &[PixelBuffer] {
        &self.levels
    }

    pub fn into_levels(self) -> Vec<PixelBuffer> {
        self.levels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(width: usize, height: usize) -> PixelBuffer {
        let data = (0..width * height)
            .flat_map(|i| {
                let x = (i % width) as f32;
                let y = (i / width) as f32;
                [
                    (x * 0.37 + y * 0.11).sin() * 0.5 + 0.5,
                    (x * y * 0.05).cos(),
                    x / width as f32,
                    0.25 + 0.01 * y,
                ]
            })
            .collect();
        PixelBuffer::from_vec(width, height, data).unwrap()
    }

    #[test]
    fn test_mirror() {
        assert_eq!(mirror(-2, 5), 2);
        assert_eq!(mirror(-1, 5), 1);
        assert_eq!(mirror(0, 5), 0);
        assert_eq!(mirror(4, 5), 4);
        assert_eq!(mirror(5, 5), 3);
        assert_eq!(mirror(6, 5), 2);
        assert_eq!(mirror(3, 2), 1);
        assert_eq!(mirror(-2, 1), 0);
    }

    #[test]
    fn test_coarse_dim() {
        assert_eq!(coarse_dim(1), 1);
        assert_eq!(coarse_dim(2), 1);
        assert_eq!(coarse_dim(3), 2);
        assert_eq!(coarse_dim(8), 4);
        assert_eq!(coarse_dim(9), 5);
    }

    #[test]
    fn test_blur_preserves_constant() {
        let input = PixelBuffer::filled(7, 5, [0.3, 0.6, 0.9, 1.0]).unwrap();
        let out = blur(&input).unwrap();
        for (a, b) in input.as_slice().iter().zip(out.as_slice()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_blur_spreads_impulse() {
        let mut input = PixelBuffer::try_zeroed(9, 9).unwrap();
        input.as_mut_slice()[(4 * 9 + 4) * CHANNELS] = 1.0;
        let out = blur(&input).unwrap();
        assert!((out.pixel(4, 4)[0] - 36.0 / 256.0).abs() < 1e-6);
        assert!((out.pixel(5, 4)[0] - 24.0 / 256.0).abs() < 1e-6);
        assert!((out.pixel(6, 6)[0] - 1.0 / 256.0).abs() < 1e-6);
        assert_eq!(out.pixel(7, 4)[0], 0.0);
        let total: f32 = out.as_slice().iter().step_by(CHANNELS).sum();
        assert!((total - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_reduce_dimensions() {
        for (w, h) in [(8, 8), (9, 7), (1, 5), (2, 2)] {
            let coarse = reduce(&pattern(w, h)).unwrap();
            assert_eq!(coarse.width(), coarse_dim(w));
            assert_eq!(coarse.height(), coarse_dim(h));
        }
    }

    #[test]
    fn test_expand_preserves_constant() {
        for (w, h) in [(8, 8), (9, 7), (4, 5), (1, 1), (1, 6)] {
            let coarse =
                PixelBuffer::filled(coarse_dim(w), coarse_dim(h), [0.5, 0.25, 2.0, 1.0]).unwrap();
            let fine = expand(&coarse, w, h).unwrap();
            for px in fine.as_slice().chunks_exact(CHANNELS) {
                assert!((px[0] - 0.5).abs() < 1e-6);
                assert!((px[1] - 0.25).abs() < 1e-6);
                assert!((px[2] - 2.0).abs() < 1e-6);
                assert!((px[3] - 1.0).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_expand_rejects_wrong_coarse_size() {
        let coarse = PixelBuffer::try_zeroed(3, 3).unwrap();
        assert!(matches!(
            expand(&coarse, 8, 8),
            Err(BufferError::SizeMismatch { .. })
        ));
    }

    #[test]
    fn test_reconstruction_even_and_odd() {
        for (w, h) in [(16, 16), (15, 9), (6, 11), (3, 2)] {
            let input = pattern(w, h);
            let (coarse, detail) = reduce_with_detail(&input).unwrap();
            let up = expand(&coarse, w, h).unwrap();
            for ((a, u), d) in input.as_slice().iter().zip(up.as_slice()).zip(detail.as_slice()) {
                assert!((u + d - a).abs() < 1e-5, "{}x{}: {} + {} != {}", w, h, u, d, a);
            }
        }
    }

    #[test]
    fn test_constant_has_no_detail() {
        let input = PixelBuffer::filled(10, 6, [0.5, 0.5, 0.5, 0.11]).unwrap();
        let (_, detail) = reduce_with_detail(&input).unwrap();
        assert!(detail.as_slice().iter().all(|d| d.abs() < 1e-6));
    }

    #[test]
    fn test_level_count_tiny_images() {
        assert_eq!(level_count(4, 4, 1.0, 1.0), 1);
        assert_eq!(level_count(6, 100, 1.0, 1.0), 1);
        assert_eq!(level_count(7, 100, 1.0, 1.0), 2);
        assert_eq!(level_count(8, 8, 1.0, 1.0), 2);
        assert_eq!(level_count(1, 1, 1.0, 1.0), 1);
    }

    #[test]
    fn test_level_count_radius() {
        // radius 256 allows all eight levels
        assert_eq!(level_count(4096, 4096, 1.0, 1.0), 8);
        // radius 64: steps 2..64 fit, 128 does not
        assert_eq!(level_count(4096, 4096, 0.25, 1.0), 7);
        // preview at 1/8 scale
        assert_eq!(level_count(4096, 4096, 0.125, 1.0), 6);
        // narrow image runs out of width first
        assert_eq!(level_count(40, 4096, 1.0, 1.0), 4);
    }

    #[test]
    fn test_pyramid_build() {
        let pyramid = GaussianPyramid::build(pattern(33, 20), 4).unwrap();
        assert_eq!(pyramid.len(), 4);
        let dims: Vec<_> = pyramid
            .levels()
            .iter()
            .map(|l| (l.width(), l.height()))
            .collect();
        assert_eq!(dims, vec![(33, 20), (17, 10), (9, 5), (5, 3)]);
        assert!(pyramid.level(4).is_none());
    }

    #[test]
    fn test_pyramid_build_clamps_levels() {
        let pyramid = GaussianPyramid::build(pattern(4, 4), 0).unwrap();
        assert_eq!(pyramid.len(), 1);
        assert!(!pyramid.is_empty());
    }
}
