//! Tone mapping and exposure fusion bindings.

use crate::curve::JsBaseCurve;
use crate::types::{to_js_error, JsPixelBuffer};
use basecurve_core::{BufferError, FusionError, FusionParams, PixelBuffer};
use wasm_bindgen::prelude::*;

/// Apply the base curve to every pixel (no fusion).
///
/// # Example (TypeScript)
/// ```typescript
/// const mapped = tone_map(image, curve);
/// const rgba = mapped.data();
/// mapped.free();
/// ```
#[wasm_bindgen]
pub fn tone_map(image: &JsPixelBuffer, curve: &JsBaseCurve) -> Result<JsPixelBuffer, JsValue> {
    run_tone_map(image, curve)
        .map(JsPixelBuffer::from_buffer)
        .map_err(to_js_error)
}

/// Blend `fusion_count + 1` virtual exposures spaced `stop_spacing` stops apart.
///
/// # Arguments
/// * `image` - Linear RGBA input
/// * `curve` - Base curve to apply to every exposure
/// * `fusion_count` - Additional exposures (0 is plain `tone_map`)
/// * `stop_spacing` - Stops between exposures
/// * `scale` - Scale of `image` relative to the full-size image
/// * `inverse_scale` - Inverse of the input scale (1.0 when unscaled)
#[wasm_bindgen]
pub fn fuse_exposures(
    image: &JsPixelBuffer,
    curve: &JsBaseCurve,
    fusion_count: u32,
    stop_spacing: f32,
    scale: f32,
    inverse_scale: f32,
) -> Result<JsPixelBuffer, JsValue> {
    let params = FusionParams::new(fusion_count, stop_spacing).with_scale(scale, inverse_scale);
    run_fusion(image, curve, &params)
        .map(JsPixelBuffer::from_buffer)
        .map_err(to_js_error)
}

fn run_tone_map(image: &JsPixelBuffer, curve: &JsBaseCurve) -> Result<PixelBuffer, BufferError> {
    basecurve_core::tone_map(image.buffer(), curve.lut(), curve.coeffs())
}

fn run_fusion(
    image: &JsPixelBuffer,
    curve: &JsBaseCurve,
    params: &FusionParams,
) -> Result<PixelBuffer, FusionError> {
    basecurve_core::fuse_exposures(image.buffer(), curve.lut(), curve.coeffs(), params)
}
