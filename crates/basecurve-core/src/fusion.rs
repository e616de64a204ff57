//! Multi-exposure fusion through Laplacian pyramids.
//!
//! The input is pushed through the base curve at `fusion_count + 1`
//! exposures, each brighter than the last by `stop_spacing` stops. Every
//! exposure is weighted per pixel (saturation, well-exposedness, local
//! contrast) and the exposures are blended scale by scale: the coarsest
//! Gaussian level blends color directly, all finer levels blend Laplacian
//! detail.
//!
//! # Algorithm
//! 1. For exposure `e`, map `input * 2^(stop_spacing * e)` through the curve.
//! 2. Compute weights, boost them by the energy of the first Laplacian level.
//! 3. Build a Gaussian pyramid of the weighted exposure.
//! 4. Accumulate `weight * value` on the coarsest level and
//!    `weight * laplacian` on the others; weights sum in channel 4.
//! 5. Normalize each level by its summed weight.
//! 6. Collapse the blended pyramid from coarse to fine.

use crate::buffer::{BufferError, PixelBuffer, CHANNELS};
use crate::curve::ToneCurveLut;
use crate::extrapolate::ExtrapolationCoefficients;
use crate::features::{apply_local_contrast, compute_features};
use crate::parallel;
use crate::pyramid::{
    coarse_dim, expand, laplacian, level_count, reduce_with_detail, GaussianPyramid,
};
use crate::tonemap::{map_buffer, tone_map};
use thiserror::Error;
use tracing::{debug, trace};

/// Weights at or below this leave the blended sample unnormalized.
const MIN_WEIGHT: f32 = 1e-8;

/// Error types for exposure fusion.
#[derive(Debug, Error, PartialEq)]
pub enum FusionError {
    /// Allocation or size error in an intermediate buffer.
    #[error(transparent)]
    Buffer(#[from] BufferError),

    /// Invalid fusion parameter.
    #[error("Invalid fusion parameter: {0}")]
    InvalidParameter(String),
}

/// Per-call fusion settings.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FusionParams {
    /// Additional exposures to blend (0 disables fusion)
    pub fusion_count: u32,
    /// Stops between consecutive exposures
    pub stop_spacing: f32,
    /// Scale of the region being processed relative to the full image
    pub scale: f32,
    /// Inverse of the pipeline's input scale
    pub inverse_scale: f32,
}

impl Default for FusionParams {
    fn default() -> Self {
        Self {
            fusion_count: 0,
            stop_spacing: 1.0,
            scale: 1.0,
            inverse_scale: 1.0,
        }
    }
}

impl FusionParams {
    pub fn new(fusion_count: u32, stop_spacing: f32) -> Self {
        Self {
            fusion_count,
            stop_spacing,
            ..Self::default()
        }
    }

    /// Set the processing scale pair.
    pub fn with_scale(mut self, scale: f32, inverse_scale: f32) -> Self {
        self.scale = scale;
        self.inverse_scale = inverse_scale;
        self
    }

    pub fn validate(&self) -> Result<(), FusionError> {
        if !self.stop_spacing.is_finite() || self.stop_spacing < 0.0 {
            return Err(FusionError::InvalidParameter(format!(
                "stop spacing must be finite and non-negative, got {}",
                self.stop_spacing
            )));
        }
        for (name, value) in [("scale", self.scale), ("inverse scale", self.inverse_scale)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(FusionError::InvalidParameter(format!(
                    "{} must be finite and positive, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }

    /// Gain applied to the input for exposure `e`.
    #[inline]
    pub fn exposure_multiplier(&self, e: u32) -> f32 {
        (self.stop_spacing * e as f32).exp2()
    }
}

/// Fuse virtual exposures of `input` into one tone-mapped image.
///
/// With `fusion_count == 0` this is exactly [`tone_map`], whatever the other
/// parameters hold. Output alpha is the input alpha.
///
/// # Errors
/// `FusionError::InvalidParameter` for bad parameters when fusing, `FusionError::Buffer`
/// if an intermediate buffer cannot be allocated. No partial image is
/// returned.
pub fn fuse_exposures(
    input: &PixelBuffer,
    lut: &ToneCurveLut,
    coeffs: &ExtrapolationCoefficients,
    params: &FusionParams,
) -> Result<PixelBuffer, FusionError> {
    // Scale and spacing only matter once there is something to fuse
    if params.fusion_count == 0 {
        return Ok(tone_map(input, lut, coeffs)?);
    }
    params.validate()?;

    let (width, height) = (input.width(), input.height());
    let levels = level_count(width, height, params.scale, params.inverse_scale);
    let exposures = params.fusion_count as usize + 1;
    debug!(
        width,
        height,
        levels,
        exposures,
        stop_spacing = params.stop_spacing,
        "fusing exposures"
    );

    let mut blended = zeroed_pyramid(width, height, levels)?;

    // Batches run concurrently; accumulation stays in exposure order
    let batch = parallel::worker_count();
    let mut first = 0;
    while first < exposures {
        let last = (first + batch).min(exposures);
        let layers = parallel::map_indices(first..last, |e| {
            exposure_contribution(input, lut, coeffs, params.exposure_multiplier(e as u32), levels)
        });
        for layer in layers {
            accumulate(&mut blended, &layer?);
        }
        first = last;
    }

    for level in blended.iter_mut() {
        normalize(level);
    }
    collapse(&mut blended)?;

    let mut output = blended.swap_remove(0);
    let alpha = input.as_slice();
    parallel::for_each_pixel(output.as_mut_slice(), |k, px| {
        px[3] = alpha[k * CHANNELS + 3];
    });
    Ok(output)
}

fn zeroed_pyramid(width: usize, height: usize, levels: usize) -> Result<Vec<PixelBuffer>, BufferError> {
    let mut out = Vec::with_capacity(levels);
    let (mut w, mut h) = (width, height);
    for _ in 0..levels {
        out.push(PixelBuffer::try_zeroed(w, h)?);
        w = coarse_dim(w);
        h = coarse_dim(h);
    }
    Ok(out)
}

/// Weighted pyramid of one exposure, ready to be summed.
fn exposure_contribution(
    input: &PixelBuffer,
    lut: &ToneCurveLut,
    coeffs: &ExtrapolationCoefficients,
    multiplier: f32,
    levels: usize,
) -> Result<Vec<PixelBuffer>, BufferError> {
    trace!(multiplier, "mapping exposure");
    let mut exposure = input.zeroed_like()?;
    map_buffer(input, &mut exposure, multiplier, lut, coeffs)?;
    compute_features(&mut exposure);

    // Contrast comes from the first detail level even if the pyramid stops at 1
    let (_, detail) = reduce_with_detail(&exposure)?;
    apply_local_contrast(&mut exposure, &detail)?;
    drop(detail);

    let pyramid = GaussianPyramid::build(exposure, levels)?.into_levels();
    let coarsest = pyramid.len() - 1;
    let mut contribution = Vec::with_capacity(pyramid.len());
    for (k, level) in pyramid.iter().enumerate() {
        let mut layer = if k == coarsest {
            level.clone()
        } else {
            laplacian(level, &pyramid[k + 1])?
        };
        // Laplacian color, Gaussian weight
        let src = level.as_slice();
        parallel::for_each_pixel(layer.as_mut_slice(), |i, px| {
            let weight = src[i * CHANNELS + 3];
            for v in &mut px[..3] {
                *v *= weight;
            }
            px[3] = weight;
        });
        contribution.push(layer);
    }
    Ok(contribution)
}

fn accumulate(blended: &mut [PixelBuffer], layer: &[PixelBuffer]) {
    for (acc, add) in blended.iter_mut().zip(layer) {
        let src = add.as_slice();
        let row_len = acc.row_len();
        parallel::for_each_row(acc.as_mut_slice(), row_len, |y, row| {
            let line = &src[y * row_len..(y + 1) * row_len];
            for (a, s) in row.iter_mut().zip(line) {
                *a += s;
            }
        });
    }
}

fn normalize(level: &mut PixelBuffer) {
    parallel::for_each_pixel(level.as_mut_slice(), |_, px| {
        let weight = px[3];
        if weight > MIN_WEIGHT {
            for v in &mut px[..3] {
                *v /= weight;
            }
        }
    });
}

/// Add each expanded coarse level onto the next finer one.
fn collapse(blended: &mut [PixelBuffer]) -> Result<(), BufferError> {
    for k in (0..blended.len().saturating_sub(1)).rev() {
        let (fine, coarse) = blended.split_at_mut(k + 1);
        let fine = &mut fine[k];
        let up = expand(&coarse[0], fine.width(), fine.height())?;
        let src = up.as_slice();
        parallel::for_each_pixel(fine.as_mut_slice(), |i, px| {
            let u = &src[i * CHANNELS..i * CHANNELS + 3];
            for (v, add) in px[..3].iter_mut().zip(u) {
                *v += add;
            }
        });
    }
    Ok(())
}
