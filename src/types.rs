//! Index newtypes and tunable parameters shared across the crate.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Identifies an arc in the network. Arc `0` is the dummy sentinel that
/// marks the end of every route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ArcId(pub u32);

/// Identifies a trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TripId(pub u32);

/// A position within a trip's route.
pub type Position = usize;

macro_rules! impl_index_id {
    ($ty:ident) => {
        impl $ty {
            /// The dummy / zero index.
            pub const ZERO: $ty = $ty(0);

            /// Returns the index as `usize`, for indexing into vectors.
            #[inline]
            pub fn index(self) -> usize {
                self.0 as usize
            }

            /// `true` for the dummy arc / trip `0` index convention used by arcs.
            #[inline]
            pub fn is_zero(self) -> bool {
                self.0 == 0
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($ty), self.0)
            }
        }

        impl From<u32> for $ty {
            fn from(x: u32) -> Self {
                Self(x)
            }
        }

        impl From<usize> for $ty {
            fn from(x: usize) -> Self {
                Self(x as u32)
            }
        }
    };
}

impl_index_id!(ArcId);
impl_index_id!(TripId);

impl ArcId {
    /// The sentinel arc that terminates every route. It carries zero travel time and zero
    /// delay unconditionally.
    pub const DUMMY: ArcId = ArcId(0);

    /// `true` if this is the dummy sentinel arc.
    #[inline]
    pub fn is_dummy(self) -> bool {
        self.0 == 0
    }
}

/// Tunable constants recognized by the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Parameters {
    /// Threshold below which two timestamps are considered tied.
    pub tie_tolerance: f64,
    /// Epsilon used for invariant checks.
    pub numeric_tolerance: f64,
    /// Minimum effective capacity factor. Reserved: no code path in the reference
    /// implementation consumes this; kept for forward compatibility.
    pub min_set_capacity: f64,
    /// How many accepted moves the driver makes between full resynchronizations via the
    /// forward simulator.
    pub resync_period: u32,
    /// Wall-clock budget, in seconds, for the local-search driver.
    pub max_time_optimization: f64,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            tie_tolerance: 1e-3,
            numeric_tolerance: 1e-6,
            min_set_capacity: 1.01,
            resync_period: 20,
            max_time_optimization: 60.0,
        }
    }
}
