//! Natural cubic spline interpolation.
//!
//! Second derivatives are solved globally with the Thomas algorithm and pinned
//! to zero at both end points.

use super::find_interval;
use crate::CurvePoint;

/// Compute second derivatives into `m` (one per point).
pub(crate) fn compute_second_derivatives(points: &[CurvePoint], m: &mut [f32]) {
    let n = points.len();
    debug_assert_eq!(m.len(), n);
    m.fill(0.0);
    if n < 3 {
        return;
    }

    // Tridiagonal system for the interior unknowns M[1..n-1]
    let inner = n - 2;
    let mut diag = vec![0.0f64; inner];
    let mut upper = vec![0.0f64; inner];
    let mut rhs = vec![0.0f64; inner];
    for k in 0..inner {
        let i = k + 1;
        let h0 = (points[i].x - points[i - 1].x) as f64;
        let h1 = (points[i + 1].x - points[i].x) as f64;
        let d0 = (points[i].y - points[i - 1].y) as f64 / h0;
        let d1 = (points[i + 1].y - points[i].y) as f64 / h1;
        diag[k] = 2.0 * (h0 + h1);
        upper[k] = h1;
        rhs[k] = 6.0 * (d1 - d0);
    }

    // Forward sweep; the sub-diagonal entry of row k is h0 of that row
    for k in 1..inner {
        let lower = (points[k + 1].x - points[k].x) as f64;
        let w = lower / diag[k - 1];
        diag[k] -= w * upper[k - 1];
        rhs[k] -= w * rhs[k - 1];
    }

    // Back substitution
    let mut next = 0.0f64;
    for k in (0..inner).rev() {
        let value = (rhs[k] - upper[k] * next) / diag[k];
        m[k + 1] = value as f32;
        next = value;
    }
}

/// Evaluate the spline at `x` (already clamped to the point domain).
pub(crate) fn evaluate(points: &[CurvePoint], m: &[f32], x: f32) -> f32 {
    let i = find_interval(points, x);
    let p0 = &points[i];
    let p1 = &points[i + 1];

    let h = p1.x - p0.x;
    if h.abs() < f32::EPSILON {
        return p0.y;
    }

    let a = (p1.x - x) / h;
    let b = (x - p0.x) / h;
    a * p0.y
        + b * p1.y
        + ((a * a * a - a) * m[i] + (b * b * b - b) * m[i + 1]) * (h * h) / 6.0
}
