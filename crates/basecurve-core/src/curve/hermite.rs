//! Monotonic cubic hermite interpolation (Fritsch-Carlson).
//!
//! Tangents are chosen so that every segment stays monotone, which means the
//! curve never leaves the range spanned by the two control points around it
//! (no solarization artifacts).

use super::find_interval;
use crate::CurvePoint;

/// Compute monotonic tangents into `m` (one per point).
pub(crate) fn compute_tangents(points: &[CurvePoint], m: &mut [f32]) {
    let n = points.len();
    debug_assert_eq!(m.len(), n);
    if n < 2 {
        m.fill(0.0);
        return;
    }

    // Secants between adjacent points
    let h: Vec<f32> = points.windows(2).map(|p| p[1].x - p[0].x).collect();
    let delta: Vec<f32> = points
        .windows(2)
        .zip(&h)
        .map(|(p, &h)| {
            if h.abs() < f32::EPSILON {
                0.0
            } else {
                (p[1].y - p[0].y) / h
            }
        })
        .collect();

    // Interior points: weighted harmonic mean, zero at local extrema
    for i in 1..n - 1 {
        if delta[i - 1].signum() != delta[i].signum()
            || delta[i - 1].abs() < f32::EPSILON
            || delta[i].abs() < f32::EPSILON
        {
            m[i] = 0.0;
        } else {
            let w1 = 2.0 * h[i] + h[i - 1];
            let w2 = h[i] + 2.0 * h[i - 1];
            m[i] = (w1 + w2) / (w1 / delta[i - 1] + w2 / delta[i]);
        }
    }

    m[0] = delta[0];
    m[n - 1] = delta[n - 2];

    // Keep alpha/beta inside the [0, 3] box where each segment is monotone
    for i in 0..n - 1 {
        if delta[i].abs() < f32::EPSILON {
            m[i] = 0.0;
            m[i + 1] = 0.0;
            continue;
        }
        let alpha = m[i] / delta[i];
        let beta = m[i + 1] / delta[i];
        if alpha > 3.0 {
            m[i] = 3.0 * delta[i];
        } else if alpha < 0.0 {
            m[i] = 0.0;
        }
        if beta > 3.0 {
            m[i + 1] = 3.0 * delta[i];
        } else if beta < 0.0 {
            m[i + 1] = 0.0;
        }
    }
}

/// Evaluate the hermite curve at `x` (already clamped to the point domain).
pub(crate) fn evaluate(points: &[CurvePoint], tangents: &[f32], x: f32) -> f32 {
    let i = find_interval(points, x);
    let p0 = &points[i];
    let p1 = &points[i + 1];

    let h = p1.x - p0.x;
    if h.abs() < f32::EPSILON {
        return p0.y;
    }

    let t = (x - p0.x) / h;
    let t2 = t * t;
    let t3 = t2 * t;

    // Hermite basis functions
    let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
    let h10 = t3 - 2.0 * t2 + t;
    let h01 = -2.0 * t3 + 3.0 * t2;
    let h11 = t3 - t2;

    h00 * p0.y + h10 * h * tangents[i] + h01 * p1.y + h11 * h * tangents[i + 1]
}
