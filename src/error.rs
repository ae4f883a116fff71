//! Fatal invariant violations.
//!
//! These are distinct from the benign [`crate::solution::Solution`] flags
//! (`infeasible`, `has_ties`, `non_improving`), which are recovered
//! internally by the local-search driver and never surface as an `Err`.
//! A [`ScheduleError`] means the engine observed a state that must never
//! occur for any valid `Instance`; it aborts the whole search.

use thiserror::Error;

use crate::types::{ArcId, TripId};

/// Fatal errors raised by the forward simulator, the incremental
/// re-evaluator, or the local-search driver.
#[derive(Error, Debug)]
pub enum ScheduleError {
    /// A trip's reinsertion counter exceeded the number of members of any
    /// conflicting set it can appear in. This can only happen if the event
    /// queue discipline itself is broken.
    #[error("trip {trip:?} was reinserted more times than its conflicting sets allow")]
    ReinsertionOverflow {
        /// The trip whose reinsertion counter overflowed.
        trip: TripId,
    },

    /// An `ACTIVATION` event was popped for a trip that was already `ACTIVE`.
    #[error("activation event popped for trip {trip:?}, which is already active")]
    DoubleActivation {
        /// The offending trip.
        trip: TripId,
    },

    /// A `TRAVEL` event was popped for a trip that is `STAGING` or `INACTIVE`.
    #[error("travel event popped for trip {trip:?} in status {status}, expected active")]
    TravelForInactiveTrip {
        /// The offending trip.
        trip: TripId,
        /// A textual rendering of the trip's actual status.
        status: &'static str,
    },

    /// The popped event's time does not match the schedule entry recorded at
    /// its position — the queue and the schedule disagree about reality.
    #[error("event time {event_time} for trip {trip:?} position {position} does not match schedule")]
    EventTimeMismatch {
        /// The offending trip.
        trip: TripId,
        /// The route position of the mismatch.
        position: usize,
        /// The time carried by the stale event.
        event_time: f64,
    },

    /// Total delay went negative, which cannot happen for a non-negative delay function.
    #[error("total delay became negative: {total_delay}")]
    NegativeTotalDelay {
        /// The offending (negative) total delay value.
        total_delay: f64,
    },

    /// A freshly re-derived flow count disagrees with the one computed incrementally.
    #[error("flow on arc {arc:?} disagrees with re-derivation: incremental={incremental}, derived={derived}")]
    FlowMismatch {
        /// The arc on which the mismatch was detected.
        arc: ArcId,
        /// The flow value computed incrementally.
        incremental: f64,
        /// The flow value computed by re-deriving from scratch.
        derived: f64,
    },

    /// JSON (de)serialization failed, from [`crate::Instance::to_json`],
    /// [`crate::Instance::from_json`], or the matching [`crate::Solution`] methods.
    #[cfg(feature = "serde")]
    #[error("{0}")]
    JsonError(Box<serde_json::Error>),
}

#[cfg(feature = "serde")]
impl From<serde_json::Error> for ScheduleError {
    fn from(value: serde_json::Error) -> Self {
        Self::JsonError(Box::new(value))
    }
}

impl PartialEq for ScheduleError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::ReinsertionOverflow { trip: l }, Self::ReinsertionOverflow { trip: r }) => l == r,
            (Self::DoubleActivation { trip: l }, Self::DoubleActivation { trip: r }) => l == r,
            (
                Self::TravelForInactiveTrip { trip: lt, status: ls },
                Self::TravelForInactiveTrip { trip: rt, status: rs },
            ) => lt == rt && ls == rs,
            (
                Self::EventTimeMismatch { trip: lt, position: lp, event_time: le },
                Self::EventTimeMismatch { trip: rt, position: rp, event_time: re },
            ) => lt == rt && lp == rp && le == re,
            (Self::NegativeTotalDelay { total_delay: l }, Self::NegativeTotalDelay { total_delay: r }) => l == r,
            (
                Self::FlowMismatch { arc: la, incremental: li, derived: ld },
                Self::FlowMismatch { arc: ra, incremental: ri, derived: rd },
            ) => la == ra && li == ri && ld == rd,
            #[cfg(feature = "serde")]
            (Self::JsonError(l), Self::JsonError(r)) => l.to_string() == r.to_string(),
            _ => false,
        }
    }
}
