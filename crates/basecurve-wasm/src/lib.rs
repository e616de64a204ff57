//! Basecurve WASM - WebAssembly bindings for base curve tone mapping
//!
//! This crate exposes curve building, tone mapping and exposure fusion from
//! basecurve-core to JavaScript/TypeScript.
//!
//! # Module Structure
//!
//! - `types` - WASM-compatible wrapper for RGBA float images
//! - `curve` - Control points to lookup table + extrapolation
//! - `process` - Tone mapping and exposure fusion entry points
//!
//! # Usage
//!
//! ```typescript
//! import init, { JsBaseCurve, JsPixelBuffer, fuse_exposures } from '@basecurve/wasm';
//!
//! await init();
//!
//! const curve = new JsBaseCurve([{ x: 0, y: 0 }, { x: 0.4, y: 0.6 }, { x: 1, y: 1 }], 1);
//! const image = new JsPixelBuffer(width, height, rgbaFloats);
//! const result = fuse_exposures(image, curve, 2, 1.0, 1.0, 1.0);
//! ```

use wasm_bindgen::prelude::*;

mod curve;
mod process;
mod types;

pub use curve::JsBaseCurve;
pub use process::{fuse_exposures, tone_map};
pub use types::JsPixelBuffer;

/// Initialize the WASM module (called automatically on load)
#[wasm_bindgen(start)]
pub fn init() {}

/// Get the version of the WASM module
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
