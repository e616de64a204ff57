//! Per-pixel fusion weights.
//!
//! A pixel's weight is the product of its saturation and well-exposedness,
//! stored in the fourth channel. Local contrast is folded in afterwards from
//! the first Laplacian level.
//!
//! A steep extrapolated tail can push bright exposures far past the range
//! where squares stay representable in f32. Mapped samples are therefore
//! bounded by [`MAX_SAMPLE`] (non-finite ones become 0) and the contrast
//! factor by [`MAX_CONTRAST`], which keeps every weight finite.

use crate::buffer::{BufferError, PixelBuffer};
use crate::parallel;

/// Width of the well-exposedness bell around mid-gray.
const EXPOSEDNESS_SIGMA: f32 = 0.4;

/// Largest magnitude a mapped color sample may have before weighting.
pub const MAX_SAMPLE: f32 = 1.0e18;

/// Upper bound of the local contrast factor.
pub const MAX_CONTRAST: f32 = 1.0e4;

/// Saturation / well-exposedness weight of one RGB triple.
#[inline]
pub fn pixel_weight(rgb: &[f32]) -> f32 {
    let (r, g, b) = (rgb[0], rgb[1], rgb[2]);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let saturation = 0.1 + 5.0 * (max - min) / max.max(1e-4);

    let v = (r - 0.5).abs().max((g - 0.5).abs()).max((b - 0.5).abs());
    let exposedness = 0.1 + (-v * v / (EXPOSEDNESS_SIGMA * EXPOSEDNESS_SIGMA)).exp();

    saturation * exposedness
}

/// Clamp a mapped sample into `[-MAX_SAMPLE, MAX_SAMPLE]`; NaN becomes 0.
#[inline]
pub fn bound_sample(v: f32) -> f32 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(-MAX_SAMPLE, MAX_SAMPLE)
    }
}

/// Bound the color samples, then overwrite the fourth channel of every pixel
/// with its weight.
pub fn compute_features(buffer: &mut PixelBuffer) {
    parallel::for_each_pixel(buffer.as_mut_slice(), |_, px| {
        for v in &mut px[..3] {
            *v = bound_sample(*v);
        }
        px[3] = pixel_weight(px);
    });
}

/// Scale weights by `0.8 + |detail.rgb|^2`, capped at [`MAX_CONTRAST`].
///
/// `detail` is the first Laplacian level of `buffer`.
pub fn apply_local_contrast(buffer: &mut PixelBuffer, detail: &PixelBuffer) -> Result<(), BufferError> {
    buffer.ensure_same_size(detail)?;
    let d = detail.as_slice();
    parallel::for_each_pixel(buffer.as_mut_slice(), |k, px| {
        let l = &d[k * 4..k * 4 + 3];
        let energy = l[0] * l[0] + l[1] * l[1] + l[2] * l[2];
        // f32::min drops NaN, so an overflowed energy saturates too
        px[3] *= (0.8 + energy).min(MAX_CONTRAST);
    });
    Ok(())
}
