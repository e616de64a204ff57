//! Per-pixel base curve application.
//!
//! This is the fast path used whenever exposure fusion is disabled, and the
//! per-exposure mapping step inside fusion.

use crate::buffer::{BufferError, PixelBuffer};
use crate::curve::ToneCurveLut;
use crate::extrapolate::ExtrapolationCoefficients;
use crate::parallel;

/// Map one color sample through the curve.
///
/// Inputs below 1.0 are looked up in the table (truncating index, negative
/// inputs land on the first entry). Inputs at or above 1.0 use the fitted
/// extrapolation.
#[inline]
pub fn map_sample(v: f32, lut: &ToneCurveLut, coeffs: &ExtrapolationCoefficients) -> f32 {
    if v < 1.0 {
        lut.lookup(v)
    } else {
        coeffs.eval(v)
    }
}

/// Map `input` into `output`, scaling color by `multiplier` before lookup.
///
/// Alpha is copied unchanged.
///
/// # Arguments
/// * `input` - Source image
/// * `output` - Destination, same dimensions as `input`
/// * `multiplier` - Exposure gain applied to R, G and B (1.0 for none)
/// * `lut` - Dense curve table
/// * `coeffs` - Extrapolation for inputs >= 1.0
///
/// # Errors
/// `BufferError::SizeMismatch` if the buffers differ in size.
pub fn map_buffer(
    input: &PixelBuffer,
    output: &mut PixelBuffer,
    multiplier: f32,
    lut: &ToneCurveLut,
    coeffs: &ExtrapolationCoefficients,
) -> Result<(), BufferError> {
    input.ensure_same_size(output)?;
    let src = input.as_slice();
    parallel::for_each_pixel(output.as_mut_slice(), |k, px| {
        let s = &src[k * 4..k * 4 + 4];
        for (o, v) in px[..3].iter_mut().zip(&s[..3]) {
            *o = map_sample(v * multiplier, lut, coeffs);
        }
        px[3] = s[3];
    });
    Ok(())
}

/// Tone map an image without fusion.
///
/// With the identity table and identity extrapolation every sample, including
/// those above 1.0, comes back (up to table quantization) unchanged.
pub fn tone_map(
    input: &PixelBuffer,
    lut: &ToneCurveLut,
    coeffs: &ExtrapolationCoefficients,
) -> Result<PixelBuffer, BufferError> {
    let mut output = input.zeroed_like()?;
    map_buffer(input, &mut output, 1.0, lut, coeffs)?;
    Ok(output)
}
