#![deny(missing_docs, missing_debug_implementations)]

//! # staggersim
//!
//! Congestion-aware trip scheduling over a fixed road network.
//!
//! An [`Instance`] describes a set of trips, each an ordered route over
//! arcs with a shared piecewise-linear congestion delay. Given a vector of
//! per-trip start times, [`Engine::construct`] runs an event-driven forward
//! simulation to compute the resulting congested [`Solution`] — every
//! trip's departure/arrival time at every route position, and the
//! network's total delay.
//!
//! [`Engine::try_run`] goes further: starting from an initial schedule, it
//! repeatedly finds the most delayed pairwise conflict between two trips
//! sharing an arc and staggers (or destaggers) one or both of them to
//! resolve it, accepting a move only when it leaves the schedule feasible
//! and no worse than before. Re-evaluating a move touches only the trips
//! actually affected by it rather than reconstructing the whole network,
//! which is what makes repeated search affordable.
//!
//! ## Example
//!
//! ```
//! use staggersim::prelude::*;
//!
//! let mut instance = Instance::new(DelayShape::new([(0.5, 1.0)]), Parameters::default());
//! let arc = instance.add_arc(6.0, 1);
//! instance.add_trip(Trip::new(vec![arc], 0.0, f64::INFINITY));
//! instance.add_trip(Trip::new(vec![arc], 0.0, f64::INFINITY));
//! instance.populate_conflicting_sets();
//!
//! let mut engine = Engine::new(&instance);
//! let solution = engine.try_run(vec![0.0, 0.0]).unwrap();
//! assert!(!solution.is_infeasible());
//! ```

mod conflict;
mod delay;
mod driver;
mod error;
mod event;
mod incremental;
mod instance;
mod simulator;
mod solution;
mod stats;
mod tie;
mod types;

/// Convenience re-export of the common members.
pub mod prelude;

pub use crate::delay::{DelayPiece, DelayShape};
pub use crate::error::ScheduleError;
pub use crate::instance::{Instance, Trip};
pub use crate::solution::Solution;
pub use crate::stats::SearchStats;
pub use crate::types::{ArcId, Parameters, Position, TripId};

use crate::driver::Driver;
use crate::simulator::Simulator;

/// The entry point: owns an [`Instance`] and the scratch state needed to
/// construct schedules from it, either a single bare pass or a full
/// local-search run.
///
/// Construction reserves the simulator's queues and the incremental
/// re-evaluator's per-trip bookkeeping once, up front, so repeated calls
/// don't reallocate.
#[derive(Debug)]
pub struct Engine<'a> {
    instance: &'a Instance,
    simulator: Simulator,
    driver: Driver,
}

impl<'a> Engine<'a> {
    /// Builds an engine bound to `instance`, reserving scratch state sized
    /// to its trip and arc counts.
    pub fn new(instance: &'a Instance) -> Self {
        Self {
            instance,
            simulator: Simulator::new(instance),
            driver: Driver::new(instance),
        }
    }

    /// Computes the congested schedule from `start_times` in a single
    /// forward pass, with no staggering attempted.
    ///
    /// `start_times` must have one entry per trip in `instance`.
    pub fn construct(&mut self, start_times: Vec<f64>) -> Solution {
        self.simulator.construct(self.instance, start_times, f64::INFINITY)
    }

    /// Runs the full local-search staggering procedure from `start_times`,
    /// returning the best schedule found within the instance's wall-clock
    /// budget ([`Parameters::max_time_optimization`]).
    ///
    /// Returns `Ok` with an infeasible [`Solution`] if even the initial
    /// schedule misses a deadline — that's an unsolvable instance, not a
    /// bug. Returns `Err` only if the engine observes a state that should
    /// be unreachable for any valid instance.
    pub fn try_run(&mut self, start_times: Vec<f64>) -> Result<Solution, ScheduleError> {
        self.driver.try_run(self.instance, start_times)
    }

    /// Counters accumulated by the most recent (and any prior) [`Engine::try_run`] call.
    pub fn stats(&self) -> SearchStats {
        self.driver.stats()
    }
}

#[cfg(test)]
mod test;
