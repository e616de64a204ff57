//! Owned RGBA float image buffers.
//!
//! Every stage of the tone mapper works on [`PixelBuffer`]: a row-major,
//! contiguous grid of 4-channel f32 samples. The fourth channel carries alpha
//! on input and output and is reused as a blending weight during fusion.
//!
//! Buffers are allocated fallibly so that a large pyramid running out of
//! memory surfaces as [`BufferError::OutOfMemory`] instead of aborting.

use thiserror::Error;

/// Samples per pixel (R, G, B, A/weight).
pub const CHANNELS: usize = 4;

/// Error types for buffer allocation and validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BufferError {
    /// Width or height is zero, or their product overflows.
    #[error("Invalid buffer dimensions {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    /// Sample data does not match the declared dimensions.
    #[error("Expected {expected} samples, got {got}")]
    SizeMismatch { expected: usize, got: usize },

    /// Out of memory while allocating a buffer.
    #[error("Out of memory allocating {0} samples")]
    OutOfMemory(usize),
}

/// A width x height RGBA f32 image.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

/// Number of f32 samples for the given dimensions.
fn sample_count(width: usize, height: usize) -> Result<usize, BufferError> {
    if width == 0 || height == 0 {
        return Err(BufferError::InvalidDimensions { width, height });
    }
    width
        .checked_mul(height)
        .and_then(|v| v.checked_mul(CHANNELS))
        .ok_or(BufferError::InvalidDimensions { width, height })
}

impl PixelBuffer {
    /// Allocate a zero-filled buffer.
    ///
    /// # Errors
    ///
    /// Returns `BufferError::InvalidDimensions` for empty or overflowing sizes
    /// and `BufferError::OutOfMemory` if the allocation fails.
    pub fn try_zeroed(width: usize, height: usize) -> Result<Self, BufferError> {
        let len = sample_count(width, height)?;
        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|_| BufferError::OutOfMemory(len))?;
        data.resize(len, 0.0);
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Wrap existing RGBA samples.
    pub fn from_vec(width: usize, height: usize, data: Vec<f32>) -> Result<Self, BufferError> {
        let expected = sample_count(width, height)?;
        if data.len() != expected {
            return Err(BufferError::SizeMismatch {
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Fill every pixel with the same RGBA value.
    pub fn filled(width: usize, height: usize, rgba: [f32; 4]) -> Result<Self, BufferError> {
        let mut buf = Self::try_zeroed(width, height)?;
        for px in buf.data.chunks_exact_mut(CHANNELS) {
            px.copy_from_slice(&rgba);
        }
        Ok(buf)
    }

    /// Allocate a zeroed buffer with the same dimensions.
    pub fn zeroed_like(&self) -> Result<Self, BufferError> {
        Self::try_zeroed(self.width, self.height)
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Samples per row (width * 4).
    #[inline]
    pub fn row_len(&self) -> usize {
        self.width * CHANNELS
    }

    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    /// RGBA value at (x, y).
    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> [f32; 4] {
        let i = (y * self.width + x) * CHANNELS;
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }

    /// Check that another buffer has the same dimensions.
    pub fn ensure_same_size(&self, other: &PixelBuffer) -> Result<(), BufferError> {
        if self.width != other.width || self.height != other.height {
            return Err(BufferError::SizeMismatch {
                expected: self.data.len(),
                got: other.data.len(),
            });
        }
        Ok(())
    }

    /// Convert from an `image` crate RGBA float buffer.
    pub fn from_rgba32f(image: &image::Rgba32FImage) -> Result<Self, BufferError> {
        Self::from_vec(
            image.width() as usize,
            image.height() as usize,
            image.as_raw().clone(),
        )
    }

    /// Convert into an `image` crate RGBA float buffer.
    pub fn into_rgba32f(self) -> Option<image::Rgba32FImage> {
        let width = u32::try_from(self.width).ok()?;
        let height = u32::try_from(self.height).ok()?;
        image::Rgba32FImage::from_raw(width, height, self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeroed_dimensions() {
        let buf = PixelBuffer::try_zeroed(3, 2).unwrap();
        assert_eq!(buf.width(), 3);
        assert_eq!(buf.height(), 2);
        assert_eq!(buf.as_slice().len(), 24);
        assert!(buf.as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        assert_eq!(
            PixelBuffer::try_zeroed(0, 5),
            Err(BufferError::InvalidDimensions {
                width: 0,
                height: 5
            })
        );
    }

    #[test]
    fn test_overflowing_dimensions_rejected() {
        assert!(matches!(
            PixelBuffer::try_zeroed(usize::MAX, 2),
            Err(BufferError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn test_from_vec_size_mismatch() {
        let result = PixelBuffer::from_vec(2, 2, vec![0.0; 15]);
        assert_eq!(
            result,
            Err(BufferError::SizeMismatch {
                expected: 16,
                got: 15
            })
        );
    }

    #[test]
    fn test_filled_and_pixel() {
        let buf = PixelBuffer::filled(2, 3, [0.1, 0.2, 0.3, 1.0]).unwrap();
        assert_eq!(buf.pixel(1, 2), [0.1, 0.2, 0.3, 1.0]);
        assert_eq!(buf.row_len(), 8);
    }

    #[test]
    fn test_ensure_same_size() {
        let a = PixelBuffer::try_zeroed(4, 4).unwrap();
        let b = PixelBuffer::try_zeroed(4, 3).unwrap();
        assert!(a.ensure_same_size(&a.clone()).is_ok());
        assert!(a.ensure_same_size(&b).is_err());
    }

    #[test]
    fn test_rgba32f_conversion() {
        let buf = PixelBuffer::filled(5, 4, [0.25, 0.5, 0.75, 1.0]).unwrap();
        let image = buf.clone().into_rgba32f().unwrap();
        assert_eq!(image.width(), 5);
        assert_eq!(image.height(), 4);
        assert_eq!(image.get_pixel(4, 3).0, [0.25, 0.5, 0.75, 1.0]);

        let back = PixelBuffer::from_rgba32f(&image).unwrap();
        assert_eq!(back, buf);
    }
}
