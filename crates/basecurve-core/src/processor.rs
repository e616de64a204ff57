//! Cached base curve state.
//!
//! [`BaseCurveProcessor`] owns the curve built from the last committed
//! [`BaseCurveParams`] together with its extrapolation, so the table is only
//! recomputed when the parameters change and not on every image.

use crate::accel::{AccelError, ToneKernelUniforms, ToneMapBackend};
use crate::buffer::{BufferError, PixelBuffer};
use crate::curve::{Curve, CurveError, ToneCurveLut};
use crate::extrapolate::{estimate_extrapolation, ExtrapolationCoefficients};
use crate::fusion::{fuse_exposures, FusionError, FusionParams};
use crate::tonemap::tone_map;
use crate::BaseCurveParams;
use thiserror::Error;
use tracing::{debug, warn};

/// Error types for committing parameters and processing images.
#[derive(Debug, Error, PartialEq)]
pub enum ProcessError {
    #[error(transparent)]
    Curve(#[from] CurveError),

    #[error(transparent)]
    Fusion(#[from] FusionError),

    #[error(transparent)]
    Accel(#[from] AccelError),

    #[error(transparent)]
    Buffer(#[from] BufferError),
}

/// Curve, table and extrapolation for one set of parameters.
#[derive(Debug, Clone)]
pub struct BaseCurveProcessor {
    params: BaseCurveParams,
    curve: Curve,
    coeffs: ExtrapolationCoefficients,
}

impl BaseCurveProcessor {
    pub fn new(params: BaseCurveParams) -> Result<Self, ProcessError> {
        params.validate()?;
        let curve = Curve::new(params.kind, &params.points)?;
        let coeffs = estimate_extrapolation(curve.lut(), curve.domain_max());
        Ok(Self {
            params,
            curve,
            coeffs,
        })
    }

    /// Replace the parameters.
    ///
    /// Returns `true` if the curve was rebuilt rather than updated in place.
    /// Invalid parameters leave the processor unchanged.
    pub fn commit(&mut self, params: BaseCurveParams) -> Result<bool, ProcessError> {
        params.validate()?;
        let rebuilt = self.curve.sync(params.kind, &params.points)?;
        self.coeffs = estimate_extrapolation(self.curve.lut(), self.curve.domain_max());
        debug!(
            rebuilt,
            exposure_fusion = params.exposure_fusion,
            "committed base curve parameters"
        );
        self.params = params;
        Ok(rebuilt)
    }

    pub fn params(&self) -> &BaseCurveParams {
        &self.params
    }

    pub fn curve(&self) -> &Curve {
        &self.curve
    }

    pub fn lut(&self) -> &ToneCurveLut {
        self.curve.lut()
    }

    pub fn coefficients(&self) -> &ExtrapolationCoefficients {
        &self.coeffs
    }

    /// Fusion settings for a region processed at `scale`.
    pub fn fusion_params(&self, scale: f32, inverse_scale: f32) -> FusionParams {
        FusionParams::new(self.params.exposure_fusion, self.params.exposure_stops)
            .with_scale(scale, inverse_scale)
    }

    /// Kernel inputs for an accelerator, if the current settings can be offloaded.
    pub fn kernel_uniforms(&self) -> Result<ToneKernelUniforms, AccelError> {
        if self.params.exposure_fusion > 0 {
            return Err(AccelError::UnsupportedFusion);
        }
        Ok(ToneKernelUniforms::new(self.curve.lut(), &self.coeffs))
    }

    /// Process an image on the CPU.
    pub fn process(
        &self,
        input: &PixelBuffer,
        scale: f32,
        inverse_scale: f32,
    ) -> Result<PixelBuffer, ProcessError> {
        let params = self.fusion_params(scale, inverse_scale);
        Ok(fuse_exposures(input, self.curve.lut(), &self.coeffs, &params)?)
    }

    /// Process an image, offloading the fast path to `backend` when possible.
    ///
    /// Fusion and backend failures run on the CPU instead.
    pub fn process_with_backend(
        &self,
        backend: &dyn ToneMapBackend,
        input: &PixelBuffer,
        scale: f32,
        inverse_scale: f32,
    ) -> Result<PixelBuffer, ProcessError> {
        let uniforms = match self.kernel_uniforms() {
            Ok(uniforms) => uniforms,
            Err(AccelError::UnsupportedFusion) => {
                debug!(backend = backend.name(), "fusion requested, processing on CPU");
                return self.process(input, scale, inverse_scale);
            }
            Err(e) => return Err(e.into()),
        };

        let mut output = input.zeroed_like()?;
        match backend.run(input, &mut output, &uniforms) {
            Ok(()) => {
                debug!(backend = backend.name(), "tone mapped on backend");
                Ok(output)
            }
            Err(AccelError::Backend(reason)) => {
                warn!(backend = backend.name(), %reason, "backend failed, processing on CPU");
                Ok(tone_map(input, self.curve.lut(), &self.coeffs)?)
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl Default for BaseCurveProcessor {
    fn default() -> Self {
        let params = BaseCurveParams::default();
        let curve = Curve::default();
        let coeffs = estimate_extrapolation(curve.lut(), curve.domain_max());
        Self {
            params,
            curve,
            coeffs,
        }
    }
}
