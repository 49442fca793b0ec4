//! Pointer events and latest-wins delivery to a session.
//!
//! Input shells can produce cursor moves faster than searches complete.
//! [`EventQueue`] keeps arrival order but collapses a run of queued cursor
//! moves into the most recent one, so a search for a stale position never
//! overwrites the result for a newer one. Seed placements are never
//! dropped and act as barriers: moves on either side of a seed are not
//! merged.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::session::{TraceSession, UpdateOutcome};
use crate::types::TraceError;

/// A pointer event in image coordinates.
///
/// Coordinates are signed so that positions reported just outside the
/// image (e.g. while dragging past an edge) can be clamped by the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PointerEvent {
    /// Primary button pressed: start a new trace here.
    PlaceSeed {
        /// Column.
        x: i64,
        /// Row.
        y: i64,
    },
    /// Pointer moved.
    MoveCursor {
        /// Column.
        x: i64,
        /// Row.
        y: i64,
    },
}

impl PointerEvent {
    /// Apply this event to a session.
    ///
    /// Seed placements report [`UpdateOutcome::Ignored`] since they do not
    /// run a search.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`TraceSession::place_seed_clamped`] and
    /// [`TraceSession::move_cursor_clamped`].
    pub fn apply(self, session: &mut TraceSession) -> Result<UpdateOutcome, TraceError> {
        match self {
            Self::PlaceSeed { x, y } => {
                session.place_seed_clamped(x, y)?;
                Ok(UpdateOutcome::Ignored)
            }
            Self::MoveCursor { x, y } => session.move_cursor_clamped(x, y),
        }
    }
}

/// FIFO of pending pointer events with latest-wins cursor coalescing.
#[derive(Debug, Default)]
pub struct EventQueue {
    pending: VecDeque<PointerEvent>,
    coalesced: usize,
}

impl EventQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue an event.
    ///
    /// A cursor move replaces a cursor move already waiting at the back of
    /// the queue.
    pub fn push(&mut self, event: PointerEvent) {
        if matches!(event, PointerEvent::MoveCursor { .. })
            && let Some(back) = self.pending.back_mut()
            && matches!(back, PointerEvent::MoveCursor { .. })
        {
            *back = event;
            self.coalesced += 1;
            return;
        }
        self.pending.push_back(event);
    }

    /// Number of events waiting.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns `true` if nothing is waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Number of cursor moves dropped in favour of newer ones so far.
    #[must_use]
    pub const fn coalesced(&self) -> usize {
        self.coalesced
    }

    /// Remove and return the oldest pending event.
    pub fn pop(&mut self) -> Option<PointerEvent> {
        self.pending.pop_front()
    }

    /// Deliver every pending event to `session`, in order.
    ///
    /// Stops at the first error; events after the failing one stay queued.
    ///
    /// # Errors
    ///
    /// Propagates the first error returned by [`PointerEvent::apply`].
    pub fn drain_into(
        &mut self,
        session: &mut TraceSession,
    ) -> Result<Vec<UpdateOutcome>, TraceError> {
        let mut outcomes = Vec::with_capacity(self.pending.len());
        while let Some(event) = self.pending.pop_front() {
            outcomes.push(event.apply(session)?);
        }
        Ok(outcomes)
    }
}
