//! Exponential extrapolation above the curve's domain.
//!
//! Inputs brighter than the reference exposure (>= 1.0) cannot be looked up
//! in the table. Instead the upper tail of the table is fitted with
//! `y = a * exp(b * x) + c`, sampled at 0.7, 0.8, 0.9 and 1.0 times the last
//! control point's x.
//!
//! ## Fit
//!
//! For an exact exponential, consecutive differences of equally spaced
//! samples grow by the constant ratio `r = exp(b * h)`. `r` is estimated by
//! least squares over the three differences, then `a` is the least-squares
//! amplitude with the value pinned to the last sample, so the extrapolation
//! starts exactly where the table ends.
//!
//! Nearly linear, flat or oscillating tails have no usable ratio. They fall
//! back to an affine least-squares line through the last sample, stored with
//! `b == 0` and the slope in `a`.

use crate::curve::ToneCurveLut;
use tracing::trace;

/// Fractions of the domain maximum at which the tail is sampled.
pub const SAMPLE_FRACTIONS: [f32; 4] = [0.7, 0.8, 0.9, 1.0];

/// Ratios closer to 1 than this are treated as a straight line.
const LINEAR_RATIO_EPS: f64 = 1e-2;

/// Bound on `|b * x|` at the anchor so `a` stays a normal f32.
const MAX_EXPONENT: f64 = 30.0;

/// Sums of squares below this are treated as zero.
const TINY: f64 = 1e-18;

/// Coefficients of `y = a * exp(b * x) + c`.
///
/// `b == 0` marks the affine limit `y = a * x + c`.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ExtrapolationCoefficients {
    pub a: f32,
    pub b: f32,
    pub c: f32,
}

impl ExtrapolationCoefficients {
    /// Straight line `y = slope * x + intercept`.
    pub fn affine(slope: f32, intercept: f32) -> Self {
        Self {
            a: slope,
            b: 0.0,
            c: intercept,
        }
    }

    /// Identity extrapolation (`y = x`).
    pub fn identity() -> Self {
        Self::affine(1.0, 0.0)
    }

    #[inline]
    pub fn is_affine(&self) -> bool {
        self.b == 0.0
    }

    /// Evaluate the extrapolation at `x`.
    #[inline]
    pub fn eval(&self, x: f32) -> f32 {
        if self.b == 0.0 {
            self.a * x + self.c
        } else {
            self.a * (self.b * x).exp() + self.c
        }
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.a, self.b, self.c]
    }

    pub fn from_array(coeffs: [f32; 3]) -> Self {
        Self {
            a: coeffs[0],
            b: coeffs[1],
            c: coeffs[2],
        }
    }
}

impl Default for ExtrapolationCoefficients {
    fn default() -> Self {
        Self::identity()
    }
}

/// Fit the extrapolation to the tail of `lut` ending at `domain_max`.
pub fn estimate_extrapolation(lut: &ToneCurveLut, domain_max: f32) -> ExtrapolationCoefficients {
    let mut xs = [0.0f64; 4];
    let mut ys = [0.0f64; 4];
    for (i, fraction) in SAMPLE_FRACTIONS.iter().enumerate() {
        let x = fraction * domain_max;
        xs[i] = x as f64;
        ys[i] = lut.lookup(x) as f64;
    }

    let coeffs = fit_exponential(&xs, &ys).unwrap_or_else(|| fit_affine(&xs, &ys));
    trace!(
        domain_max,
        a = coeffs.a,
        b = coeffs.b,
        c = coeffs.c,
        "estimated extrapolation"
    );
    coeffs
}

fn fit_exponential(xs: &[f64; 4], ys: &[f64; 4]) -> Option<ExtrapolationCoefficients> {
    let (x3, y3) = (xs[3], ys[3]);
    let h = (x3 - xs[0]) / 3.0;
    if h <= 0.0 {
        return None;
    }

    let d = [ys[1] - ys[0], ys[2] - ys[1], ys[3] - ys[2]];
    let den = d[0] * d[0] + d[1] * d[1];
    if den < TINY {
        return None;
    }
    let r = (d[0] * d[1] + d[1] * d[2]) / den;
    if r <= 0.0 || (r - 1.0).abs() < LINEAR_RATIO_EPS {
        return None;
    }
    let b = r.ln() / h;
    if (b * x3).abs() > MAX_EXPONENT {
        return None;
    }

    // Least-squares amplitude of exp(b * (x - x3)) with the last sample pinned
    let mut num = 0.0;
    let mut su = 0.0;
    for (x, y) in xs.iter().zip(ys).take(3) {
        let u = (b * (x - x3)).exp() - 1.0;
        num += u * (y - y3);
        su += u * u;
    }
    if su < TINY {
        return None;
    }
    let amplitude = num / su;

    let coeffs = ExtrapolationCoefficients {
        a: (amplitude * (-b * x3).exp()) as f32,
        b: b as f32,
        c: (y3 - amplitude) as f32,
    };
    let finite = coeffs.a.is_finite() && coeffs.b.is_finite() && coeffs.c.is_finite();
    (finite && coeffs.b != 0.0).then_some(coeffs)
}

fn fit_affine(xs: &[f64; 4], ys: &[f64; 4]) -> ExtrapolationCoefficients {
    let (x3, y3) = (xs[3], ys[3]);
    let mut num = 0.0;
    let mut sx = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        num += (x - x3) * (y - y3);
        sx += (x - x3) * (x - x3);
    }
    let slope = if sx < TINY { 0.0 } else { num / sx };
    ExtrapolationCoefficients::affine(slope as f32, (y3 - slope * x3) as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::{build_curve, LUT_SIZE};
    use crate::{CurveKind, CurvePoint};

    fn table_from_fn(f: impl Fn(f32) -> f32) -> ToneCurveLut {
        let table = (0..LUT_SIZE).map(|i| f(ToneCurveLut::abscissa(i))).collect();
        ToneCurveLut::from_table(table).unwrap()
    }

    #[test]
    fn test_identity_curve_extrapolates_linearly() {
        let lut = ToneCurveLut::identity();
        let coeffs = estimate_extrapolation(&lut, 1.0);
        assert!(coeffs.is_affine());
        for x in [1.0f32, 1.5, 2.0, 4.0, 8.0] {
            assert!(
                (coeffs.eval(x) - x).abs() < 1e-3 * x,
                "eval({}) = {}",
                x,
                coeffs.eval(x)
            );
        }
    }

    #[test]
    fn test_recovers_exponential_tail() {
        let lut = table_from_fn(|x| 0.2 * (1.5 * x).exp() - 0.1);
        let coeffs = estimate_extrapolation(&lut, 1.0);
        assert!(!coeffs.is_affine());
        assert!((coeffs.b - 1.5).abs() < 0.05, "b = {}", coeffs.b);
        let expected = 0.2 * 3.0f32.exp() - 0.1;
        assert!(
            (coeffs.eval(2.0) - expected).abs() < 0.02 * expected,
            "eval(2) = {}, expected {}",
            coeffs.eval(2.0),
            expected
        );
    }

    #[test]
    fn test_saturating_tail_decays() {
        // Shoulder that flattens out toward 1.0
        let lut = table_from_fn(|x| 1.0 - 0.5 * (-4.0 * x).exp());
        let coeffs = estimate_extrapolation(&lut, 1.0);
        assert!(coeffs.b < 0.0);
        let far = coeffs.eval(10.0);
        assert!(far > coeffs.eval(1.0) && far <= 1.0 + 1e-3, "far = {}", far);
    }

    #[test]
    fn test_flat_tail_is_constant() {
        let lut = table_from_fn(|_| 0.6);
        let coeffs = estimate_extrapolation(&lut, 1.0);
        assert!(coeffs.is_affine());
        assert_eq!(coeffs.a, 0.0);
        assert!((coeffs.eval(5.0) - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_continuity_at_domain_max() {
        let cases = [
            vec![
                CurvePoint::new(0.0, 0.0),
                CurvePoint::new(0.25, 0.4),
                CurvePoint::new(0.8, 0.9),
            ],
            vec![
                CurvePoint::new(0.0, 0.0),
                CurvePoint::new(0.143357, 0.370145),
                CurvePoint::new(0.457952, 0.853462),
                CurvePoint::new(0.904758, 0.985699),
                CurvePoint::new(1.0, 1.0),
            ],
        ];
        for points in cases {
            for kind in [CurveKind::MonotoneHermite, CurveKind::CubicSpline] {
                let lut = build_curve(&points, kind).unwrap();
                let xm = points[points.len() - 1].x;
                let coeffs = estimate_extrapolation(&lut, xm);
                let from_table = lut.lookup(xm);
                let from_fit = coeffs.eval(xm);
                assert!(
                    (from_table - from_fit).abs() < 1e-4,
                    "{:?}: table {} vs fit {}",
                    kind,
                    from_table,
                    from_fit
                );
            }
        }
    }

    #[test]
    fn test_array_round_trip() {
        let coeffs = ExtrapolationCoefficients {
            a: 0.5,
            b: -2.0,
            c: 1.0,
        };
        assert_eq!(ExtrapolationCoefficients::from_array(coeffs.to_array()), coeffs);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::curve::build_curve;
    use crate::{CurveKind, CurvePoint};
    use proptest::prelude::*;

    proptest! {
        /// Property: the fit is finite and continuous for any 3-point curve.
        #[test]
        fn prop_fit_finite_and_continuous(
            x1 in 0.05f32..0.45,
            y1 in 0.0f32..1.0,
            x2 in 0.5f32..1.0,
            y2 in 0.0f32..1.0,
        ) {
            let points = [
                CurvePoint::new(0.0, 0.0),
                CurvePoint::new(x1, y1.min(y2)),
                CurvePoint::new(x2, y1.max(y2)),
            ];
            let lut = build_curve(&points, CurveKind::MonotoneHermite).unwrap();
            let coeffs = estimate_extrapolation(&lut, x2);
            prop_assert!(coeffs.a.is_finite() && coeffs.b.is_finite() && coeffs.c.is_finite());
            prop_assert!((coeffs.eval(x2) - lut.lookup(x2)).abs() < 1e-4);
        }
    }
}
