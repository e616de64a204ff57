//! Offload contract for the non-fusion fast path.
//!
//! A backend receives the input image, an output image of the same size and
//! a [`ToneKernelUniforms`] bundle: the curve table packed as a 256x256
//! single-channel texture plus the three extrapolation coefficients. It runs
//! one invocation per pixel over a 2D grid rounded up to its workgroup size;
//! invocations outside the image do nothing.
//!
//! Fusion is never offloaded. [`CpuReferenceBackend`] is the reference every
//! other backend must match bit for bit.

use crate::buffer::{BufferError, PixelBuffer, CHANNELS};
use crate::curve::{ToneCurveLut, LUT_SIZE};
use crate::extrapolate::ExtrapolationCoefficients;
use crate::parallel;
use thiserror::Error;
use tracing::trace;

/// Side length of the square table texture.
pub const TABLE_TEXTURE_DIM: usize = 256;

/// Default 2D workgroup size.
pub const DEFAULT_WORKGROUP: (usize, usize) = (16, 16);

/// Error types for accelerator dispatch.
#[derive(Debug, Error, PartialEq)]
pub enum AccelError {
    /// The request needs exposure fusion, which only runs on the CPU.
    #[error("Exposure fusion is not supported by accelerator backends")]
    UnsupportedFusion,

    /// Input and output do not fit the dispatch.
    #[error(transparent)]
    Buffer(#[from] BufferError),

    /// The backend itself failed (device lost, out of device memory, ...).
    #[error("Backend failure: {0}")]
    Backend(String),
}

/// Kernel inputs shared by every invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ToneKernelUniforms {
    texture: Vec<f32>,
    /// Extrapolation `[a, b, c]`
    pub coeffs: [f32; 3],
}

impl ToneKernelUniforms {
    pub fn new(lut: &ToneCurveLut, coeffs: &ExtrapolationCoefficients) -> Self {
        // Entry i lives at texel (i & 0xff, i >> 8), which is row-major order
        Self {
            texture: lut.as_slice().to_vec(),
            coeffs: coeffs.to_array(),
        }
    }

    /// Texture data, `TABLE_TEXTURE_DIM` rows of `TABLE_TEXTURE_DIM` texels.
    pub fn texture(&self) -> &[f32] {
        &self.texture
    }

    /// Texel coordinates holding the table entry for input `v`.
    #[inline]
    pub fn texel(v: f32) -> (usize, usize) {
        let i = ToneCurveLut::index_of(v);
        (i & 0xff, i >> 8)
    }

    /// Map one sample the way the kernel does.
    #[inline]
    pub fn sample(&self, v: f32) -> f32 {
        if v < 1.0 {
            let (u, w) = Self::texel(v);
            self.texture[w * TABLE_TEXTURE_DIM + u]
        } else {
            ExtrapolationCoefficients::from_array(self.coeffs).eval(v)
        }
    }
}

/// Grid size covering `width` x `height`, rounded up to `workgroup`.
pub fn dispatch_size(width: usize, height: usize, workgroup: (usize, usize)) -> (usize, usize) {
    let round = |n: usize, g: usize| n.div_ceil(g.max(1)) * g.max(1);
    (round(width, workgroup.0), round(height, workgroup.1))
}

/// A device that can run the per-pixel tone kernel.
pub trait ToneMapBackend: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    /// Map `input` into `output` using `uniforms`.
    fn run(
        &self,
        input: &PixelBuffer,
        output: &mut PixelBuffer,
        uniforms: &ToneKernelUniforms,
    ) -> Result<(), AccelError>;
}

/// Host implementation of the kernel grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuReferenceBackend {
    workgroup: (usize, usize),
}

impl CpuReferenceBackend {
    pub fn new() -> Self {
        Self {
            workgroup: DEFAULT_WORKGROUP,
        }
    }

    pub fn with_workgroup(width: usize, height: usize) -> Self {
        Self {
            workgroup: (width.max(1), height.max(1)),
        }
    }
}

impl Default for CpuReferenceBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ToneMapBackend for CpuReferenceBackend {
    fn name(&self) -> &str {
        "cpu-reference"
    }

    fn run(
        &self,
        input: &PixelBuffer,
        output: &mut PixelBuffer,
        uniforms: &ToneKernelUniforms,
    ) -> Result<(), AccelError> {
        input.ensure_same_size(output)?;
        if uniforms.texture.len() != LUT_SIZE {
            return Err(AccelError::Backend(format!(
                "table texture has {} texels, expected {}",
                uniforms.texture.len(),
                LUT_SIZE
            )));
        }

        let (width, height) = (input.width(), input.height());
        let (wx, wy) = self.workgroup;
        let (grid_x, grid_y) = dispatch_size(width, height, self.workgroup);
        trace!(backend = self.name(), grid_x, grid_y, wx, wy, "dispatching tone kernel");

        let row_len = input.row_len();
        let src = input.as_slice();
        // One job per row of workgroups; the bottom band may cover fewer rows
        parallel::for_each_row(output.as_mut_slice(), row_len * wy, |ty, band| {
            for tx in 0..grid_x / wx {
                for ly in 0..wy {
                    for lx in 0..wx {
                        let (gx, gy) = (tx * wx + lx, ty * wy + ly);
                        if gx >= width || gy >= height {
                            continue;
                        }
                        let i = gy * row_len + gx * CHANNELS;
                        let o = ly * row_len + gx * CHANNELS;
                        invoke(uniforms, &src[i..i + CHANNELS], &mut band[o..o + CHANNELS]);
                    }
                }
            }
        });
        Ok(())
    }
}

/// One kernel invocation: map RGB, copy alpha.
#[inline]
fn invoke(uniforms: &ToneKernelUniforms, src: &[f32], out: &mut [f32]) {
    for (o, v) in out[..3].iter_mut().zip(&src[..3]) {
        *o = uniforms.sample(*v);
    }
    out[3] = src[3];
}

/// Tone map through `backend`.
pub fn tone_map_with_backend(
    backend: &dyn ToneMapBackend,
    input: &PixelBuffer,
    lut: &ToneCurveLut,
    coeffs: &ExtrapolationCoefficients,
) -> Result<PixelBuffer, AccelError> {
    let uniforms = ToneKernelUniforms::new(lut, coeffs);
    let mut output = input.zeroed_like()?;
    backend.run(input, &mut output, &uniforms)?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::build_curve;
    use crate::extrapolate::estimate_extrapolation;
    use crate::tonemap::tone_map;
    use crate::{CurveKind, CurvePoint};

    fn test_image(width: usize, height: usize) -> PixelBuffer {
        let data = (0..width * height)
            .flat_map(|i| {
                let v = i as f32 / (width * height) as f32;
                [v * 3.0, v, 1.0 - v, 0.9]
            })
            .collect();
        PixelBuffer::from_vec(width, height, data).unwrap()
    }

    #[test]
    fn test_dispatch_size_rounds_up() {
        assert_eq!(dispatch_size(16, 16, (16, 16)), (16, 16));
        assert_eq!(dispatch_size(17, 1, (16, 16)), (32, 16));
        assert_eq!(dispatch_size(100, 33, (8, 4)), (104, 36));
    }

    #[test]
    fn test_texel_layout() {
        assert_eq!(ToneKernelUniforms::texel(0.0), (0, 0));
        assert_eq!(ToneKernelUniforms::texel(255.5 / 65536.0), (255, 0));
        assert_eq!(ToneKernelUniforms::texel(256.5 / 65536.0), (0, 1));
        assert_eq!(ToneKernelUniforms::texel(0.99999), (255, 255));
    }

    #[test]
    fn test_cpu_backend_matches_tone_map() {
        let points = [
            CurvePoint::new(0.0, 0.0),
            CurvePoint::new(0.2, 0.4),
            CurvePoint::new(0.6, 0.85),
            CurvePoint::new(1.0, 1.0),
        ];
        let lut = build_curve(&points, CurveKind::CubicSpline).unwrap();
        let coeffs = estimate_extrapolation(&lut, 1.0);
        let input = test_image(37, 19);

        let expected = tone_map(&input, &lut, &coeffs).unwrap();
        for backend in [
            CpuReferenceBackend::new(),
            CpuReferenceBackend::with_workgroup(8, 8),
            CpuReferenceBackend::with_workgroup(64, 1),
        ] {
            let got = tone_map_with_backend(&backend, &input, &lut, &coeffs).unwrap();
            assert_eq!(got, expected, "workgroup {:?}", backend.workgroup);
        }
    }

    #[test]
    fn test_partial_workgroups_cover_every_pixel() {
        let lut = ToneCurveLut::identity();
        let coeffs = ExtrapolationCoefficients::affine(0.5, 0.5);
        for (w, h) in [(1, 1), (5, 3), (17, 33)] {
            let input = test_image(w, h);
            let expected = tone_map(&input, &lut, &coeffs).unwrap();
            for backend in [
                CpuReferenceBackend::with_workgroup(32, 32),
                CpuReferenceBackend::with_workgroup(3, 5),
                CpuReferenceBackend::with_workgroup(1, 1),
            ] {
                let got = tone_map_with_backend(&backend, &input, &lut, &coeffs).unwrap();
                assert_eq!(got, expected, "{}x{} workgroup {:?}", w, h, backend.workgroup);
            }
        }
    }

    #[test]
    fn test_cpu_backend_rejects_size_mismatch() {
        let input = test_image(4, 4);
        let mut output = PixelBuffer::try_zeroed(4, 5).unwrap();
        let uniforms =
            ToneKernelUniforms::new(&ToneCurveLut::identity(), &ExtrapolationCoefficients::identity());
        assert!(matches!(
            CpuReferenceBackend::new().run(&input, &mut output, &uniforms),
            Err(AccelError::Buffer(BufferError::SizeMismatch { .. }))
        ));
    }
}
