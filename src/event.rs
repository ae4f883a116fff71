//! Shared event, ordering, and state-machine types used by both the
//! forward simulator and the incremental re-evaluator.
//!
//! Mirrors how `bgpsim::event` owns the `Event` type shared by the
//! network's simulation components.

use std::cmp::Ordering;

use ordered_float::NotNan;

use crate::types::{ArcId, Position, TripId};

/// The kind of a queued event. Only meaningful to the incremental
/// re-evaluator; the forward simulator's queue only ever carries
/// `Travel` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Process the next position of an active trip.
    Travel,
    /// Promote a staging trip to active.
    Activation,
}

/// A single queued departure, ordered by `(time, arc_id, trip_id)` per
/// this ordering is load-bearing: the marking rules depend on it for
/// determinism.
#[derive(Debug, Clone, Copy)]
pub struct Departure {
    /// The time at which this event fires.
    pub time: NotNan<f64>,
    /// The arc this departure is on.
    pub arc: ArcId,
    /// The trip this departure belongs to.
    pub trip: TripId,
    /// The trip's route position this departure represents.
    pub position: Position,
    /// `Travel` or `Activation`.
    pub kind: EventKind,
    /// The trip's reinsertion counter at the time this event was pushed;
    /// used by the incremental re-evaluator to detect and drop stale
    /// `Travel` events.
    pub reinsertion: u32,
}

impl Departure {
    /// The total, deterministic tie-break ordering: `(time, arc_id, trip_id)`.
    fn sort_key(&self) -> (NotNan<f64>, u32, u32) {
        (self.time, self.arc.0, self.trip.0)
    }
}

impl PartialEq for Departure {
    fn eq(&self, other: &Self) -> bool {
        self.sort_key() == other.sort_key()
    }
}
impl Eq for Departure {}

impl PartialOrd for Departure {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Departure {
    /// Reversed so a `std::collections::BinaryHeap<Departure>` pops the
    /// *smallest* key first (a min-priority-queue over `(time, arc, trip)`).
    fn cmp(&self, other: &Self) -> Ordering {
        other.sort_key().cmp(&self.sort_key())
    }
}

/// A trip's state in the incremental re-evaluator's per-trip state machine —
/// a proper enum where the original C++ conflates a boolean with a deferred list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripStatus {
    /// Not yet touched by this incremental pass.
    Inactive,
    /// Marked for re-examination; waiting for its `Activation` event to pop.
    Staging,
    /// Currently being advanced through its route.
    Active,
}

/// The three-valued outcome of deciding whether another trip must be
/// re-examined after the current trip's processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkDecision {
    /// Push an `Activation` event for the other trip immediately.
    Mark,
    /// Defer the decision to a "maybe-mark" list, reconsidered once the
    /// current trip's new arrival time is known.
    Wait,
    /// The other trip's order relative to the current trip is unaffected.
    NoMark,
}
