//! Tone curve interpolation and LUT generation.
//!
//! A [`Curve`] owns validated control points, the interpolant coefficients for
//! its [`CurveKind`], and a dense 65536-entry [`ToneCurveLut`] sampled over
//! [0, 1]. Inputs left of the first control point map to its y value, inputs
//! right of the last one map to the last y value; values above 1.0 are handled
//! by the exponential extrapolation instead of the table.
//!
//! Changing the kind or the number of points rebuilds the curve. Moving
//! points without changing their count updates the existing coefficient and
//! table storage in place.

mod hermite;
mod lut;
mod spline;

pub use lut::{ToneCurveLut, LUT_SIZE};

use crate::parallel::for_each_row;
use crate::{CurveKind, CurvePoint, MAX_NODES};
use thiserror::Error;
use tracing::{debug, trace};

/// Table entries evaluated per parallel job.
const LUT_CHUNK: usize = 4096;

/// Error types for control point validation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CurveError {
    /// Fewer than two control points.
    #[error("Curve needs at least 2 control points, got {0}")]
    TooFewPoints(usize),

    /// More than [`MAX_NODES`] control points.
    #[error("Curve supports at most 20 control points, got {0}")]
    TooManyPoints(usize),

    /// x coordinates are not strictly increasing.
    #[error("Control point {index} has x={x}, not greater than the previous point")]
    NonMonotonic { index: usize, x: f32 },

    /// A coordinate is outside [0, 1] or not finite.
    #[error("Control point {index} ({x}, {y}) is outside [0, 1]")]
    OutOfRange { index: usize, x: f32, y: f32 },
}

/// Validate a control point list.
///
/// # Errors
///
/// Returns a [`CurveError`] describing the first problem found.
pub fn validate_points(points: &[CurvePoint]) -> Result<(), CurveError> {
    if points.len() < 2 {
        return Err(CurveError::TooFewPoints(points.len()));
    }
    if points.len() > MAX_NODES {
        return Err(CurveError::TooManyPoints(points.len()));
    }
    for (index, p) in points.iter().enumerate() {
        if !(0.0..=1.0).contains(&p.x) || !(0.0..=1.0).contains(&p.y) {
            return Err(CurveError::OutOfRange {
                index,
                x: p.x,
                y: p.y,
            });
        }
        if index > 0 && p.x <= points[index - 1].x {
            return Err(CurveError::NonMonotonic { index, x: p.x });
        }
    }
    Ok(())
}

/// Build the dense lookup table for a set of control points.
///
/// # Errors
///
/// Returns a [`CurveError`] if the points are invalid.
pub fn build_curve(points: &[CurvePoint], kind: CurveKind) -> Result<ToneCurveLut, CurveError> {
    Ok(Curve::new(kind, points)?.into_lut())
}

/// A validated tone curve with its cached lookup table.
#[derive(Debug, Clone)]
pub struct Curve {
    kind: CurveKind,
    points: Vec<CurvePoint>,
    /// Tangents (hermite) or second derivatives (spline), one per point
    coeffs: Vec<f32>,
    lut: ToneCurveLut,
}

impl Curve {
    /// Build a curve and its table.
    pub fn new(kind: CurveKind, points: &[CurvePoint]) -> Result<Self, CurveError> {
        validate_points(points)?;
        debug!(?kind, nodes = points.len(), "building curve");
        let mut curve = Self {
            kind,
            points: points.to_vec(),
            coeffs: vec![0.0; points.len()],
            lut: ToneCurveLut::identity(),
        };
        curve.recompute();
        Ok(curve)
    }

    /// Bring the curve in line with `kind` and `points`.
    ///
    /// Returns `true` if the curve had to be rebuilt (kind or point count
    /// changed) and `false` if it was updated in place. On error the curve is
    /// left untouched.
    pub fn sync(&mut self, kind: CurveKind, points: &[CurvePoint]) -> Result<bool, CurveError> {
        if kind != self.kind || points.len() != self.points.len() {
            *self = Self::new(kind, points)?;
            return Ok(true);
        }
        validate_points(points)?;
        trace!(nodes = points.len(), "updating curve in place");
        self.points.copy_from_slice(points);
        self.recompute();
        Ok(false)
    }

    /// Move the control points, keeping the current kind.
    pub fn set_points(&mut self, points: &[CurvePoint]) -> Result<bool, CurveError> {
        self.sync(self.kind, points)
    }

    fn recompute(&mut self) {
        match self.kind {
            CurveKind::MonotoneHermite => hermite::compute_tangents(&self.points, &mut self.coeffs),
            CurveKind::CubicSpline => {
                spline::compute_second_derivatives(&self.points, &mut self.coeffs)
            }
        }

        let kind = self.kind;
        let points = &self.points;
        let coeffs = &self.coeffs;
        for_each_row(self.lut.as_mut_slice(), LUT_CHUNK, |chunk, values| {
            let base = chunk * LUT_CHUNK;
            for (offset, value) in values.iter_mut().enumerate() {
                let x = ToneCurveLut::abscissa(base + offset);
                *value = evaluate_points(kind, points, coeffs, x);
            }
        });
    }

    /// Evaluate the continuous curve at `x`.
    pub fn evaluate(&self, x: f32) -> f32 {
        evaluate_points(self.kind, &self.points, &self.coeffs, x)
    }

    #[inline]
    pub fn kind(&self) -> CurveKind {
        self.kind
    }

    #[inline]
    pub fn points(&self) -> &[CurvePoint] {
        &self.points
    }

    /// x of the last control point (the right edge of the curve's domain).
    #[inline]
    pub fn domain_max(&self) -> f32 {
        self.points[self.points.len() - 1].x
    }

    #[inline]
    pub fn lut(&self) -> &ToneCurveLut {
        &self.lut
    }

    pub fn into_lut(self) -> ToneCurveLut {
        self.lut
    }
}

impl Default for Curve {
    /// Linear monotone hermite curve through (0, 0) and (1, 1).
    fn default() -> Self {
        let mut curve = Self {
            kind: CurveKind::MonotoneHermite,
            points: vec![CurvePoint::new(0.0, 0.0), CurvePoint::new(1.0, 1.0)],
            coeffs: vec![0.0; 2],
            lut: ToneCurveLut::identity(),
        };
        curve.recompute();
        curve
    }
}

fn evaluate_points(kind: CurveKind, points: &[CurvePoint], coeffs: &[f32], x: f32) -> f32 {
    let n = points.len();
    let x = x.clamp(points[0].x, points[n - 1].x);
    let y = match kind {
        CurveKind::MonotoneHermite => hermite::evaluate(points, coeffs, x),
        CurveKind::CubicSpline => spline::evaluate(points, coeffs, x),
    };
    y.clamp(0.0, 1.0)
}

/// Binary search for the segment containing x.
pub(crate) fn find_interval(points: &[CurvePoint], x: f32) -> usize {
    let n = points.len();
    if n <= 2 {
        return 0;
    }

    let mut low = 0;
    let mut high = n - 2;

    while low < high {
        let mid = (low + high).div_ceil(2);
        if points[mid].x <= x {
            low = mid;
        } else {
            high = mid - 1;
        }
    }

    low
}
