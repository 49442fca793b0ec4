//! Stateful live-wire tracing.
//!
//! A [`TraceSession`] owns the cost field for the current raster and the
//! tracing state layered on top of it: the seed, the last cursor position
//! and the live path from seed to cursor. Every cursor move re-runs the
//! search from the seed and merges the fresh segment into the live path.
//!
//! When the live path grows past [`TraceConfig::max_length`] the seed is
//! moved forward along it (re-anchoring). Pixels before the new seed are
//! frozen: they remain part of [`TraceSession::boundary`] but later cursor
//! moves can no longer change them. This bounds the search distance, and
//! therefore the latency, of every subsequent move.

use serde::{Deserialize, Serialize};

use crate::cost::CostField;
use crate::search::{self, SearchStats, SearchWorkspace};
use crate::types::{Dimensions, Pixel, PixelPath, TraceConfig, TraceError};

/// Whether a seed has been placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// No seed placed; cursor moves are ignored.
    Idle,
    /// Tracing from `seed`.
    Tracking {
        /// Current search origin.
        seed: Pixel,
    },
}

/// What a cursor update did.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    /// The session was idle; nothing changed.
    Ignored,
    /// The live path was recomputed.
    Traced {
        /// Set when the seed moved forward before searching.
        reanchored: Option<Reanchor>,
        /// Statistics of the search that produced the new segment.
        stats: SearchStats,
        /// Length of the freshly computed segment.
        segment_len: usize,
        /// Whether the segment was appended (`true`) or replaced the live
        /// path (`false`).
        appended: bool,
    },
}

/// Record of a single re-anchoring step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reanchor {
    /// The seed before re-anchoring.
    pub old_seed: Pixel,
    /// The new seed.
    pub new_seed: Pixel,
    /// Number of pixels moved into frozen history.
    pub frozen: usize,
}

/// Serializable view of the session for renderers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Tracing state (and seed, when tracking).
    pub state: SessionState,
    /// Last cursor position, if any.
    pub cursor: Option<Pixel>,
    /// Live path from the seed to the cursor.
    pub accumulated: PixelPath,
    /// History frozen by re-anchoring, ending just before the seed.
    pub frozen: Vec<Pixel>,
    /// Grid the session traces over.
    pub dimensions: Dimensions,
}

/// Live-wire session over one cost field.
#[derive(Debug)]
pub struct TraceSession {
    cost: CostField,
    config: TraceConfig,
    state: SessionState,
    cursor: Option<Pixel>,
    accumulated: PixelPath,
    frozen: Vec<Pixel>,
    workspace: SearchWorkspace,
}

impl TraceSession {
    /// Create an idle session over `cost`.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::InvalidConfig`] if `config` fails
    /// [`TraceConfig::validate`].
    pub fn new(cost: CostField, config: TraceConfig) -> Result<Self, TraceError> {
        config.validate()?;
        Ok(Self {
            cost,
            config,
            state: SessionState::Idle,
            cursor: None,
            accumulated: PixelPath::default(),
            frozen: Vec::new(),
            workspace: SearchWorkspace::new(),
        })
    }

    /// Install the cost field of a newly loaded raster.
    ///
    /// All tracing state is cleared and the session returns to idle.
    pub fn install_cost(&mut self, cost: CostField) {
        self.cost = cost;
        self.reset();
    }

    /// Return to idle, discarding seed, cursor and both paths.
    pub fn reset(&mut self) {
        self.state = SessionState::Idle;
        self.cursor = None;
        self.accumulated = PixelPath::default();
        self.frozen.clear();
    }

    /// Place a new seed, discarding any previous trace.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::CoordinateOutOfRange`] if `seed` is outside
    /// the grid; the session is left unchanged.
    pub fn place_seed(&mut self, seed: Pixel) -> Result<(), TraceError> {
        self.dimensions().check(seed)?;
        self.state = SessionState::Tracking { seed };
        self.cursor = None;
        self.accumulated = PixelPath::new(vec![seed]);
        self.frozen.clear();
        log::debug!("seed placed at {seed}");
        Ok(())
    }

    /// Place a seed from raw pointer coordinates, clamped to the grid.
    ///
    /// # Errors
    ///
    /// See [`place_seed`](Self::place_seed).
    pub fn place_seed_clamped(&mut self, x: i64, y: i64) -> Result<(), TraceError> {
        let seed = self.clamp(x, y)?;
        self.place_seed(seed)
    }

    /// Move the cursor and recompute the live path.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::CoordinateOutOfRange`] if `cursor` is outside
    /// the grid (use [`move_cursor_clamped`](Self::move_cursor_clamped)
    /// for raw pointer input), or any error from the search.
    pub fn move_cursor(&mut self, cursor: Pixel) -> Result<UpdateOutcome, TraceError> {
        self.dimensions().check(cursor)?;
        let SessionState::Tracking { seed } = self.state else {
            return Ok(UpdateOutcome::Ignored);
        };
        self.cursor = Some(cursor);

        let reanchored = self.reanchor_if_needed(seed);
        let seed = reanchored.map_or(seed, |r| r.new_seed);

        let (segment, stats) = search::find_path_in(&mut self.workspace, &self.cost, seed, cursor)?;
        let segment_len = segment.len();
        let appended = self.merge(segment);

        Ok(UpdateOutcome::Traced {
            reanchored,
            stats,
            segment_len,
            appended,
        })
    }

    /// Move the cursor from raw pointer coordinates, clamped to the grid.
    ///
    /// # Errors
    ///
    /// See [`move_cursor`](Self::move_cursor).
    pub fn move_cursor_clamped(&mut self, x: i64, y: i64) -> Result<UpdateOutcome, TraceError> {
        let cursor = self.clamp(x, y)?;
        self.move_cursor(cursor)
    }

    fn clamp(&self, x: i64, y: i64) -> Result<Pixel, TraceError> {
        let dims = self.dimensions();
        let pixel = dims.clamp(x, y).ok_or(TraceError::CoordinateOutOfRange {
            x,
            y,
            width: dims.width,
            height: dims.height,
        })?;
        if i64::from(pixel.x) != x || i64::from(pixel.y) != y {
            log::warn!("pointer ({x}, {y}) clamped to {pixel}");
        }
        Ok(pixel)
    }

    /// Move the seed forward once the live path exceeds `max_length`.
    fn reanchor_if_needed(&mut self, seed: Pixel) -> Option<Reanchor> {
        let len = self.accumulated.len();
        if len <= self.config.max_length {
            return None;
        }
        let index = self.config.reanchor.anchor_index(len);
        let new_seed = *self.accumulated.pixels().get(index)?;
        let prefix = self.accumulated.drain_prefix(index);
        self.frozen.extend_from_slice(&prefix);
        self.state = SessionState::Tracking { seed: new_seed };
        log::debug!(
            "re-anchored {seed} -> {new_seed}: froze {} pixels, {} live",
            prefix.len(),
            self.accumulated.len(),
        );
        Some(Reanchor {
            old_seed: seed,
            new_seed,
            frozen: prefix.len(),
        })
    }

    /// Stitch a fresh segment onto the live path.
    ///
    /// Appends without the duplicated joint when the segment starts at the
    /// live path's end; otherwise the segment replaces the live path.
    fn merge(&mut self, segment: PixelPath) -> bool {
        match (segment.first(), self.accumulated.last()) {
            (Some(head), Some(tail)) if head == tail => {
                self.accumulated.extend_from_slice(&segment.pixels()[1..]);
                true
            }
            (Some(_), _) => {
                self.accumulated = segment;
                false
            }
            (None, _) => false,
        }
    }

    /// Current tracing state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Current seed, if tracking.
    #[must_use]
    pub const fn seed(&self) -> Option<Pixel> {
        match self.state {
            SessionState::Idle => None,
            SessionState::Tracking { seed } => Some(seed),
        }
    }

    /// Last cursor position accepted while tracking.
    #[must_use]
    pub const fn cursor(&self) -> Option<Pixel> {
        self.cursor
    }

    /// Live path from the seed to the cursor.
    #[must_use]
    pub const fn accumulated(&self) -> &PixelPath {
        &self.accumulated
    }

    /// History frozen by re-anchoring.
    #[must_use]
    pub fn frozen(&self) -> &[Pixel] {
        &self.frozen
    }

    /// Whole traced boundary: frozen history followed by the live path.
    #[must_use]
    pub fn boundary(&self) -> PixelPath {
        let mut pixels = self.frozen.clone();
        pixels.extend_from_slice(self.accumulated.pixels());
        PixelPath::new(pixels)
    }

    /// The cost field being traced over.
    #[must_use]
    pub const fn cost(&self) -> &CostField {
        &self.cost
    }

    /// Session configuration.
    #[must_use]
    pub const fn config(&self) -> &TraceConfig {
        &self.config
    }

    /// Grid dimensions of the installed cost field.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        self.cost.dimensions()
    }

    /// Serializable copy of the renderer-facing state.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            cursor: self.cursor,
            accumulated: self.accumulated.clone(),
            frozen: self.frozen.clone(),
            dimensions: self.dimensions(),
        }
    }

    #[cfg(test)]
    pub(crate) fn set_accumulated_for_test(&mut self, seed: Pixel, pixels: Vec<Pixel>) {
        self.state = SessionState::Tracking { seed };
        self.accumulated = PixelPath::new(pixels);
    }
}
