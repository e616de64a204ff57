//! Basecurve Core - Tone mapping library
//!
//! This crate turns a sparse set of tone control points into a dense lookup
//! table, applies it to linear RGBA float images, and optionally compresses
//! high dynamic range by fusing several virtual exposures through a Laplacian
//! pyramid.
//!
//! # Module Structure
//!
//! - `curve` - Control point validation, interpolation and the 65536-entry LUT
//! - `extrapolate` - Exponential fit used for inputs above 1.0
//! - `tonemap` - Per-pixel curve application (the non-fusion fast path)
//! - `pyramid` - Gaussian blur, reduce/expand and Laplacian layers
//! - `features` - Saturation / well-exposedness / local contrast weights
//! - `fusion` - Multi-exposure blending
//! - `accel` - Grid-kernel contract for offloading the fast path
//! - `processor` - Cached curve state driven by [`BaseCurveParams`]

pub mod accel;
pub mod buffer;
pub mod curve;
pub mod extrapolate;
pub mod features;
pub mod fusion;
mod parallel;
pub mod processor;
pub mod pyramid;
pub mod tonemap;

pub use accel::{AccelError, CpuReferenceBackend, ToneKernelUniforms, ToneMapBackend};
pub use buffer::{BufferError, PixelBuffer};
pub use curve::{build_curve, Curve, CurveError, ToneCurveLut, LUT_SIZE};
pub use extrapolate::{estimate_extrapolation, ExtrapolationCoefficients};
pub use fusion::{fuse_exposures, FusionError, FusionParams};
pub use processor::{BaseCurveProcessor, ProcessError};
pub use pyramid::GaussianPyramid;
pub use tonemap::{map_buffer, map_sample, tone_map};

/// Maximum number of control points a curve may hold.
pub const MAX_NODES: usize = 20;

/// Interpolation used between control points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum CurveKind {
    /// Natural cubic spline through all points.
    CubicSpline,
    /// Fritsch-Carlson monotone cubic hermite (never overshoots).
    #[default]
    MonotoneHermite,
}

impl From<u8> for CurveKind {
    fn from(value: u8) -> Self {
        match value {
            0 => CurveKind::CubicSpline,
            _ => CurveKind::MonotoneHermite,
        }
    }
}

/// Tone curve control point
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CurvePoint {
    /// Input value (0.0 to 1.0)
    pub x: f32,
    /// Output value (0.0 to 1.0)
    pub y: f32,
}

impl CurvePoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Base curve parameters as supplied by the host.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct BaseCurveParams {
    /// Interpolation kind
    pub kind: CurveKind,
    /// Control points (sorted by x, 2 to 20 entries)
    pub points: Vec<CurvePoint>,
    /// Number of additional exposures to fuse (0 disables fusion)
    pub exposure_fusion: u32,
    /// Stops between consecutive fused exposures
    pub exposure_stops: f32,
}

impl Default for BaseCurveParams {
    fn default() -> Self {
        Self {
            kind: CurveKind::MonotoneHermite,
            // Linear curve by default
            points: vec![CurvePoint::new(0.0, 0.0), CurvePoint::new(1.0, 1.0)],
            exposure_fusion: 0,
            exposure_stops: 1.0,
        }
    }
}

impl BaseCurveParams {
    /// Create parameters for the identity curve without fusion
    pub fn new() -> Self {
        Self::default()
    }

    /// Check that the curve and fusion settings can be committed.
    pub fn validate(&self) -> Result<(), ProcessError> {
        curve::validate_points(&self.points)?;
        if !self.exposure_stops.is_finite() || self.exposure_stops < 0.0 {
            return Err(FusionError::InvalidParameter(format!(
                "exposure stops must be finite and non-negative, got {}",
                self.exposure_stops
            ))
            .into());
        }
        Ok(())
    }

    /// Check if the curve is the identity without fusion (no adjustment)
    pub fn is_identity(&self) -> bool {
        if self.exposure_fusion != 0 || self.points.len() != 2 {
            return false;
        }
        let first = &self.points[0];
        let last = &self.points[1];
        first.x.abs() < f32::EPSILON
            && first.y.abs() < f32::EPSILON
            && (last.x - 1.0).abs() < f32::EPSILON
            && (last.y - 1.0).abs() < f32::EPSILON
    }
}
