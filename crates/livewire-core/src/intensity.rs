//! Raster to intensity conversion.
//!
//! Accepts an RGB raster (or encoded image bytes) and produces a
//! single-channel floating-point field suitable for gradient analysis.
//!
//! This is the first stage of the engine: pixels in, [`IntensityField`] out.

use image::{GrayImage, ImageBuffer, Luma, RgbImage};

use crate::types::{Dimensions, TraceError};

/// Single-channel `f32` raster shared by the intensity and cost fields.
pub type FloatImage = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Luma weights for R, G and B (ITU-R BT.601).
const LUMA_WEIGHTS: [f32; 3] = [0.299, 0.587, 0.114];

/// Per-pixel luminance in `[0, 255]`, computed once per raster.
#[derive(Debug, Clone, PartialEq)]
pub struct IntensityField {
    values: FloatImage,
}

impl IntensityField {
    /// Build the field from an RGB raster.
    ///
    /// Each value is `0.299*R + 0.587*G + 0.114*B`.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::InvalidInput`] if the raster has zero width or
    /// height.
    pub fn build(raster: &RgbImage) -> Result<Self, TraceError> {
        check_dimensions(raster.width(), raster.height())?;
        Self::from_rgb_unchecked(raster.width(), raster.height(), raster.as_raw())
    }

    /// Build the field from raw, tightly packed RGB8 bytes.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::InvalidInput`] if either dimension is zero,
    /// if `data` is empty, or if `data.len() != 3 * width * height`.
    pub fn from_rgb8(width: u32, height: u32, data: &[u8]) -> Result<Self, TraceError> {
        check_dimensions(width, height)?;
        if data.is_empty() {
            return Err(TraceError::InvalidInput("pixel data is absent".to_string()));
        }
        let expected = Dimensions { width, height }.pixel_count() * 3;
        if data.len() != expected {
            return Err(TraceError::InvalidInput(format!(
                "expected {expected} bytes of RGB8 data for {width}x{height}, got {}",
                data.len()
            )));
        }
        Self::from_rgb_unchecked(width, height, data)
    }

    fn from_rgb_unchecked(width: u32, height: u32, data: &[u8]) -> Result<Self, TraceError> {
        let values: Vec<f32> = data
            .chunks_exact(3)
            .map(|rgb| {
                LUMA_WEIGHTS[0].mul_add(
                    f32::from(rgb[0]),
                    LUMA_WEIGHTS[1].mul_add(f32::from(rgb[1]), LUMA_WEIGHTS[2] * f32::from(rgb[2])),
                )
            })
            .collect();
        let values = FloatImage::from_raw(width, height, values).ok_or_else(|| {
            TraceError::InvariantViolation(format!("intensity buffer does not fit {width}x{height}"))
        })?;
        Ok(Self { values })
    }

    /// Grid dimensions.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.values.width(),
            height: self.values.height(),
        }
    }

    /// Intensity at `(x, y)`. Panics on out-of-bounds like `image` does.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.values.get_pixel(x, y).0[0]
    }

    /// The underlying raster.
    #[must_use]
    pub const fn as_image(&self) -> &FloatImage {
        &self.values
    }

    /// Round and clamp into an 8-bit grayscale image for previews.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn to_gray8(&self) -> GrayImage {
        GrayImage::from_fn(self.values.width(), self.values.height(), |x, y| {
            Luma([self.get(x, y).round().clamp(0.0, 255.0) as u8])
        })
    }
}

/// Decode encoded image bytes and build the intensity field.
///
/// Supports whatever the `image` crate was built with (PNG, JPEG, BMP,
/// WebP, GIF). Alpha is discarded.
///
/// # Errors
///
/// Returns [`TraceError::EmptyInput`] if `bytes` is empty.
/// Returns [`TraceError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
/// Returns [`TraceError::InvalidInput`] if the decoded image is empty.
pub fn decode(bytes: &[u8]) -> Result<(RgbImage, IntensityField), TraceError> {
    if bytes.is_empty() {
        return Err(TraceError::EmptyInput);
    }
    let raster = image::load_from_memory(bytes)?.to_rgb8();
    let field = IntensityField::build(&raster)?;
    Ok((raster, field))
}

fn check_dimensions(width: u32, height: u32) -> Result<(), TraceError> {
    if width == 0 || height == 0 {
        return Err(TraceError::InvalidInput(format!(
            "raster must be non-empty, got {width}x{height}"
        )));
    }
    Ok(())
}
