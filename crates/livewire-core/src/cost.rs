//! Gradient-derived traversal cost.
//!
//! Sobel gradients are computed with replicate-edge borders: neighbour
//! coordinates that fall outside the grid are clamped to the nearest
//! valid row/column, so border pixels see the same kind of neighbourhood
//! as interior ones instead of an artificial step to zero.
//!
//! Magnitudes are mapped linearly to cost, `cost = max(gmax - g, floor)`,
//! so the strongest edges in the image are the cheapest to follow and no
//! pixel is ever free.

use image::Luma;

use crate::intensity::{FloatImage, IntensityField};
use crate::types::{Dimensions, Pixel, TraceError, validate_cost_floor};

type Kernel3 = [[f32; 3]; 3];

const SOBEL_KERNEL_X: Kernel3 = [[-1.0, 0.0, 1.0], [-2.0, 0.0, 2.0], [-1.0, 0.0, 1.0]];
const SOBEL_KERNEL_Y: Kernel3 = [[-1.0, -2.0, -1.0], [0.0, 0.0, 0.0], [1.0, 2.0, 1.0]];

/// Sobel gradient magnitude `sqrt(gx^2 + gy^2)` for every pixel.
///
/// Borders use replicate-edge clamping.
#[must_use]
pub fn gradient_magnitude(intensity: &IntensityField) -> FloatImage {
    let src = intensity.as_image();
    let (w, h) = src.dimensions();
    let mut mag = FloatImage::new(w, h);
    if w == 0 || h == 0 {
        return mag;
    }

    for y in 0..h {
        let y_idx = [y.saturating_sub(1), y, (y + 1).min(h - 1)];
        for x in 0..w {
            let x_idx = [x.saturating_sub(1), x, (x + 1).min(w - 1)];

            let mut sum_x = 0.0f32;
            let mut sum_y = 0.0f32;
            for (ky, &yy) in y_idx.iter().enumerate() {
                for (kx, &xx) in x_idx.iter().enumerate() {
                    let v = src.get_pixel(xx, yy).0[0];
                    sum_x = SOBEL_KERNEL_X[ky][kx].mul_add(v, sum_x);
                    sum_y = SOBEL_KERNEL_Y[ky][kx].mul_add(v, sum_y);
                }
            }
            mag.put_pixel(x, y, Luma([sum_x.hypot(sum_y)]));
        }
    }
    mag
}

/// Per-pixel traversal cost, computed once per raster.
///
/// Invariant: every value is finite and lies in `(0, max(gmax, floor)]`.
#[derive(Debug, Clone, PartialEq)]
pub struct CostField {
    values: FloatImage,
    gmax: f32,
    floor: f32,
}

impl CostField {
    /// Build the cost field from an intensity field.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::InvalidConfig`] if `floor` is not finite and
    /// strictly positive.
    pub fn build(intensity: &IntensityField, floor: f32) -> Result<Self, TraceError> {
        validate_cost_floor(floor)?;

        let magnitude = gradient_magnitude(intensity);
        let gmax = magnitude.pixels().map(|p| p.0[0]).fold(0.0f32, f32::max);

        let mut values = magnitude;
        for p in values.pixels_mut() {
            p.0[0] = (gmax - p.0[0]).max(floor);
        }

        log::debug!(
            "cost field built: {}x{}, gmax={gmax:.3}, floor={floor}",
            values.width(),
            values.height(),
        );

        Ok(Self {
            values,
            gmax,
            floor,
        })
    }

    /// Grid dimensions.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.values.width(),
            height: self.values.height(),
        }
    }

    /// Cost at `(x, y)`. Panics on out-of-bounds like `image` does.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.values.get_pixel(x, y).0[0]
    }

    /// Cost at an in-bounds pixel.
    #[must_use]
    pub fn at(&self, pixel: Pixel) -> f32 {
        self.get(pixel.x, pixel.y)
    }

    /// Largest gradient magnitude observed when the field was built.
    #[must_use]
    pub const fn gmax(&self) -> f32 {
        self.gmax
    }

    /// The strictly positive cost floor.
    #[must_use]
    pub const fn floor(&self) -> f32 {
        self.floor
    }

    /// Row-major cost values.
    #[must_use]
    pub fn as_raw(&self) -> &[f32] {
        self.values.as_raw()
    }

    /// The underlying raster.
    #[must_use]
    pub const fn as_image(&self) -> &FloatImage {
        &self.values
    }
}
