//! WASM-compatible wrapper for RGBA float images.

use basecurve_core::PixelBuffer;
use std::fmt::Display;
use wasm_bindgen::prelude::*;

/// An RGBA f32 image for JavaScript.
///
/// Pixel data is row-major with four floats per pixel. Color is linear and
/// may exceed 1.0; the fourth channel is alpha and passes through processing
/// untouched.
///
/// # Memory Management
///
/// The samples live in WASM memory. `data()` copies them out to a
/// `Float32Array`. Call `free()` to release a large image early; otherwise
/// wasm-bindgen's finalizer cleans up.
#[wasm_bindgen]
pub struct JsPixelBuffer {
    inner: PixelBuffer,
}

#[wasm_bindgen]
impl JsPixelBuffer {
    /// Create an image from dimensions and RGBA samples.
    ///
    /// # Errors
    /// Returns error if the dimensions are zero or `data` has the wrong length.
    #[wasm_bindgen(constructor)]
    pub fn new(width: u32, height: u32, data: Vec<f32>) -> Result<JsPixelBuffer, JsValue> {
        PixelBuffer::from_vec(width as usize, height as usize, data)
            .map(Self::from_buffer)
            .map_err(to_js_error)
    }

    /// Get the image width in pixels
    #[wasm_bindgen(getter)]
    pub fn width(&self) -> u32 {
        self.inner.width() as u32
    }

    /// Get the image height in pixels
    #[wasm_bindgen(getter)]
    pub fn height(&self) -> u32 {
        self.inner.height() as u32
    }

    /// Number of f32 samples (width * height * 4)
    pub fn sample_count(&self) -> usize {
        self.inner.as_slice().len()
    }

    /// Returns the RGBA samples as a Float32Array (copied).
    pub fn data(&self) -> Vec<f32> {
        self.inner.as_slice().to_vec()
    }

    /// Explicitly free WASM memory.
    pub fn free(self) {}
}

impl JsPixelBuffer {
    pub(crate) fn from_buffer(inner: PixelBuffer) -> Self {
        Self { inner }
    }

    pub(crate) fn buffer(&self) -> &PixelBuffer {
        &self.inner
    }
}

/// Convert a core error into a JS exception value.
pub(crate) fn to_js_error(e: impl Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}
