//! Base curve WASM bindings.
//!
//! A [`JsBaseCurve`] holds the curve, its 65536-entry table and the
//! extrapolation fitted to it, ready to be passed to `tone_map` or
//! `fuse_exposures`.

use crate::types::to_js_error;
use basecurve_core::{
    estimate_extrapolation, Curve, CurveError, CurveKind, CurvePoint, ExtrapolationCoefficients,
    ToneCurveLut,
};
use wasm_bindgen::prelude::*;

/// JavaScript-accessible base curve.
///
/// # Example (TypeScript)
/// ```typescript
/// const points = [
///   { x: 0, y: 0 },
///   { x: 0.25, y: 0.35 },
///   { x: 1, y: 1 }
/// ];
/// // kind: 0 = cubic spline, 1 = monotone hermite
/// const curve = new JsBaseCurve(points, 1);
/// const table = curve.table(); // Float32Array(65536)
/// curve.free();
/// ```
#[wasm_bindgen]
pub struct JsBaseCurve {
    curve: Curve,
    coeffs: ExtrapolationCoefficients,
}

/// Helper struct for deserializing JS curve points via serde.
#[derive(serde::Deserialize)]
struct CurvePointJs {
    x: f32,
    y: f32,
}

fn points_from_js(points: JsValue) -> Result<Vec<CurvePoint>, JsValue> {
    let points: Vec<CurvePointJs> = serde_wasm_bindgen::from_value(points)
        .map_err(|e| JsValue::from_str(&format!("Invalid curve points: {}", e)))?;
    Ok(points.into_iter().map(|p| CurvePoint::new(p.x, p.y)).collect())
}

#[wasm_bindgen]
impl JsBaseCurve {
    /// Create a curve from control points.
    ///
    /// # Arguments
    /// * `points` - Array of {x: number, y: number} objects, sorted by x
    /// * `kind` - 0 for cubic spline, anything else for monotone hermite
    ///
    /// # Errors
    /// Returns error if points cannot be deserialized or are invalid
    #[wasm_bindgen(constructor)]
    pub fn new(points: JsValue, kind: u8) -> Result<JsBaseCurve, JsValue> {
        let points = points_from_js(points)?;
        Self::from_points(&points, CurveKind::from(kind)).map_err(to_js_error)
    }

    /// Create a curve from parallel x and y arrays.
    pub fn from_arrays(xs: &[f32], ys: &[f32], kind: u8) -> Result<JsBaseCurve, JsValue> {
        if xs.len() != ys.len() {
            return Err(JsValue::from_str(&format!(
                "x and y arrays differ in length ({} vs {})",
                xs.len(),
                ys.len()
            )));
        }
        Self::from_slices(xs, ys, CurveKind::from(kind)).map_err(to_js_error)
    }

    /// Linear curve (no tone change below 1.0).
    pub fn identity() -> JsBaseCurve {
        let curve = Curve::default();
        let coeffs = estimate_extrapolation(curve.lut(), curve.domain_max());
        JsBaseCurve { curve, coeffs }
    }

    /// Move the control points.
    ///
    /// Returns true if the curve was rebuilt (point count changed).
    pub fn set_points(&mut self, points: JsValue) -> Result<bool, JsValue> {
        let points = points_from_js(points)?;
        self.update(&points).map_err(to_js_error)
    }

    /// The dense lookup table (65536 entries over [0, 1]).
    pub fn table(&self) -> js_sys::Float32Array {
        js_sys::Float32Array::from(self.curve.lut().as_slice())
    }

    /// Extrapolation coefficients [a, b, c] of `a * exp(b * x) + c`.
    pub fn coefficients(&self) -> Vec<f32> {
        self.coeffs.to_array().to_vec()
    }

    /// Evaluate the continuous curve at `x` (for drawing).
    pub fn evaluate(&self, x: f32) -> f32 {
        self.curve.evaluate(x)
    }

    /// Number of control points.
    pub fn node_count(&self) -> usize {
        self.curve.points().len()
    }

    /// Explicitly free WASM memory.
    pub fn free(self) {}
}

impl JsBaseCurve {
    pub(crate) fn from_points(points: &[CurvePoint], kind: CurveKind) -> Result<Self, CurveError> {
        let curve = Curve::new(kind, points)?;
        let coeffs = estimate_extrapolation(curve.lut(), curve.domain_max());
        Ok(Self { curve, coeffs })
    }

    pub(crate) fn from_slices(xs: &[f32], ys: &[f32], kind: CurveKind) -> Result<Self, CurveError> {
        let points: Vec<CurvePoint> = xs
            .iter()
            .zip(ys)
            .map(|(&x, &y)| CurvePoint::new(x, y))
            .collect();
        Self::from_points(&points, kind)
    }

    pub(crate) fn update(&mut self, points: &[CurvePoint]) -> Result<bool, CurveError> {
        let rebuilt = self.curve.set_points(points)?;
        self.coeffs = estimate_extrapolation(self.curve.lut(), self.curve.domain_max());
        Ok(rebuilt)
    }

    pub(crate) fn lut(&self) -> &ToneCurveLut {
        self.curve.lut()
    }

    pub(crate) fn coeffs(&self) -> &ExtrapolationCoefficients {
        &self.coeffs
    }
}


/// WASM-specific tests that require JsValue.
///
/// These tests use the `JsBaseCurve::new` constructor which takes a `JsValue`
/// parameter and can only run on wasm32 targets. Use `wasm-pack test` to run these.
#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use serde::Serialize;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[derive(Serialize)]
    struct TestCurvePoint {
        x: f32,
        y: f32,
    }

    fn js_points(points: &[(f32, f32)]) -> JsValue {
        let points: Vec<TestCurvePoint> = points
            .iter()
            .map(|&(x, y)| TestCurvePoint { x, y })
            .collect();
        serde_wasm_bindgen::to_value(&points).unwrap()
    }

    #[wasm_bindgen_test]
    fn test_create_from_js_points() {
        let curve = JsBaseCurve::new(js_points(&[(0.0, 0.0), (0.5, 0.6), (1.0, 1.0)]), 1).unwrap();
        assert_eq!(curve.node_count(), 3);
        assert_eq!(curve.table().length(), 65536);
    }

    #[wasm_bindgen_test]
    fn test_create_rejects_single_point() {
        assert!(JsBaseCurve::new(js_points(&[(0.5, 0.5)]), 1).is_err());
    }

    #[wasm_bindgen_test]
    fn test_create_rejects_garbage() {
        assert!(JsBaseCurve::new(JsValue::from_str("not points"), 0).is_err());
    }

    #[wasm_bindgen_test]
    fn test_from_arrays_length_mismatch() {
        assert!(JsBaseCurve::from_arrays(&[0.0, 1.0], &[0.0], 1).is_err());
    }

    #[wasm_bindgen_test]
    fn test_set_points() {
        let mut curve = JsBaseCurve::new(js_points(&[(0.0, 0.0), (1.0, 1.0)]), 1).unwrap();
        let rebuilt = curve
            .set_points(js_points(&[(0.0, 0.0), (0.4, 0.6), (1.0, 1.0)]))
            .unwrap();
        assert!(rebuilt);
    }
}
