//! Shared types for the live-wire tracing engine.

use serde::{Deserialize, Serialize};

/// Re-export `RgbImage` so downstream crates can hand rasters to the
/// engine without depending on `image` directly.
pub use image::RgbImage;

/// An integer pixel coordinate in image space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Pixel {
    /// Column (pixels from left edge).
    pub x: u32,
    /// Row (pixels from top edge).
    pub y: u32,
}

impl Pixel {
    /// Create a new pixel coordinate.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Returns `true` if `other` is one of the 8 grid neighbours of `self`.
    ///
    /// A pixel is not adjacent to itself.
    #[must_use]
    pub const fn is_adjacent(self, other: Self) -> bool {
        let dx = self.x.abs_diff(other.x);
        let dy = self.y.abs_diff(other.y);
        dx <= 1 && dy <= 1 && (dx + dy) > 0
    }

    /// Returns `true` if `other` is a diagonal neighbour of `self`.
    #[must_use]
    pub const fn is_diagonal_to(self, other: Self) -> bool {
        self.x.abs_diff(other.x) == 1 && self.y.abs_diff(other.y) == 1
    }
}

impl std::fmt::Display for Pixel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// An ordered sequence of grid-adjacent pixels.
///
/// Paths produced by the search always start at the seed that was active
/// when they were computed and never repeat a pixel back-to-back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelPath(Vec<Pixel>);

impl PixelPath {
    /// Create a new path from a vector of pixels.
    #[must_use]
    pub const fn new(pixels: Vec<Pixel>) -> Self {
        Self(pixels)
    }

    /// Returns `true` if the path has no pixels.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of pixels in the path.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns the first pixel, if any.
    #[must_use]
    pub fn first(&self) -> Option<&Pixel> {
        self.0.first()
    }

    /// Returns the last pixel, if any.
    #[must_use]
    pub fn last(&self) -> Option<&Pixel> {
        self.0.last()
    }

    /// Returns a slice of all pixels.
    #[must_use]
    pub fn pixels(&self) -> &[Pixel] {
        &self.0
    }

    /// Consumes the path and returns the underlying vector of pixels.
    #[must_use]
    pub fn into_pixels(self) -> Vec<Pixel> {
        self.0
    }

    /// Returns `true` if every consecutive pair is 8-grid-adjacent.
    ///
    /// Empty and single-pixel paths are trivially connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.0.windows(2).all(|w| w[0].is_adjacent(w[1]))
    }

    /// Append pixels to the end of the path.
    pub(crate) fn extend_from_slice(&mut self, pixels: &[Pixel]) {
        self.0.extend_from_slice(pixels);
    }

    /// Split off everything before `index`, keeping `[index..]` in place.
    ///
    /// Returns the removed prefix.
    pub(crate) fn drain_prefix(&mut self, index: usize) -> Vec<Pixel> {
        self.0.drain(..index).collect()
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Returns `true` if `pixel` lies inside the grid.
    #[must_use]
    pub const fn contains(self, pixel: Pixel) -> bool {
        pixel.x < self.width && pixel.y < self.height
    }

    /// Total number of pixels (`width * height`).
    #[must_use]
    pub const fn pixel_count(self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Row-major linear index of an in-bounds pixel.
    #[must_use]
    pub(crate) const fn index_of(self, pixel: Pixel) -> usize {
        pixel.y as usize * self.width as usize + pixel.x as usize
    }

    /// Inverse of [`index_of`](Self::index_of).
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) const fn pixel_at(self, index: usize) -> Pixel {
        // Both components are bounded by `width`/`height`, which are `u32`.
        let w = self.width as usize;
        Pixel::new((index % w) as u32, (index / w) as u32)
    }

    /// Reject a pixel that lies outside the grid.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::CoordinateOutOfRange`] if `pixel` is outside.
    pub fn check(self, pixel: Pixel) -> Result<Pixel, TraceError> {
        if self.contains(pixel) {
            Ok(pixel)
        } else {
            Err(TraceError::CoordinateOutOfRange {
                x: i64::from(pixel.x),
                y: i64::from(pixel.y),
                width: self.width,
                height: self.height,
            })
        }
    }

    /// Clamp raw pointer coordinates to the nearest in-bounds pixel.
    ///
    /// Returns `None` for an empty grid.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn clamp(self, x: i64, y: i64) -> Option<Pixel> {
        if self.width == 0 || self.height == 0 {
            return None;
        }
        // Clamped into [0, dim - 1], so the casts cannot truncate.
        let cx = x.clamp(0, i64::from(self.width) - 1) as u32;
        let cy = y.clamp(0, i64::from(self.height) - 1) as u32;
        Some(Pixel::new(cx, cy))
    }
}

/// How the session picks a new seed once the live path grows past
/// [`TraceConfig::max_length`].
///
/// Every policy freezes the history before the new seed; frozen pixels
/// are never revised by later cursor moves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReanchorPolicy {
    /// New seed is `accumulated[len / 2]`.
    #[default]
    Midpoint,
    /// New seed is `accumulated[len - keep]`, leaving the last `keep`
    /// pixels live.
    KeepTail {
        /// Number of trailing pixels that stay revisable.
        keep: usize,
    },
}

impl ReanchorPolicy {
    /// Index of the new seed inside a live path of length `len`.
    #[must_use]
    pub const fn anchor_index(self, len: usize) -> usize {
        match self {
            Self::Midpoint => len / 2,
            Self::KeepTail { keep } => len.saturating_sub(keep),
        }
    }
}

/// Configuration for cost-field construction and trace sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    /// Live path length above which the session re-anchors its seed.
    pub max_length: usize,

    /// Seed re-anchoring policy.
    pub reanchor: ReanchorPolicy,

    /// Strictly positive lower bound on per-pixel traversal cost.
    pub cost_floor: f32,
}

impl TraceConfig {
    /// Default live path length bound.
    pub const DEFAULT_MAX_LENGTH: usize = 100;

    /// Default cost floor (epsilon).
    pub const DEFAULT_COST_FLOOR: f32 = 1.0;

    /// Check the configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::InvalidConfig`] if `max_length < 2`, if
    /// `cost_floor` is not finite and strictly positive, or if a
    /// [`ReanchorPolicy::KeepTail`] keeps zero pixels or more pixels than
    /// `max_length`.
    pub fn validate(&self) -> Result<(), TraceError> {
        if self.max_length < 2 {
            return Err(TraceError::InvalidConfig(format!(
                "max_length must be at least 2, got {}",
                self.max_length
            )));
        }
        validate_cost_floor(self.cost_floor)?;
        if let ReanchorPolicy::KeepTail { keep } = self.reanchor
            && (keep == 0 || keep > self.max_length)
        {
            return Err(TraceError::InvalidConfig(format!(
                "keep_tail must be in 1..={}, got {keep}",
                self.max_length
            )));
        }
        Ok(())
    }
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            max_length: Self::DEFAULT_MAX_LENGTH,
            reanchor: ReanchorPolicy::default(),
            cost_floor: Self::DEFAULT_COST_FLOOR,
        }
    }
}

/// Reject a cost floor that would allow free or undefined traversal.
pub(crate) fn validate_cost_floor(cost_floor: f32) -> Result<(), TraceError> {
    if cost_floor.is_finite() && cost_floor > 0.0 {
        Ok(())
    } else {
        Err(TraceError::InvalidConfig(format!(
            "cost_floor must be finite and > 0, got {cost_floor}"
        )))
    }
}

/// Errors that can occur while building fields or tracing.
#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    /// The raster has zero width/height or missing pixel data.
    #[error("invalid raster: {0}")]
    InvalidInput(String),

    /// The encoded image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// A coordinate lies outside the image grid.
    #[error("coordinate ({x}, {y}) is outside the {width}x{height} grid")]
    CoordinateOutOfRange {
        /// Requested column.
        x: i64,
        /// Requested row.
        y: i64,
        /// Grid width.
        width: u32,
        /// Grid height.
        height: u32,
    },

    /// Configuration is invalid.
    #[error("invalid trace configuration: {0}")]
    InvalidConfig(String),

    /// The search exhausted its frontier without reaching the target.
    ///
    /// The grid is always connected with finite positive weights, so
    /// this indicates a defective cost field rather than a user error.
    #[error("internal invariant violated: {0}")]
    InvariantViolation(String),
}
