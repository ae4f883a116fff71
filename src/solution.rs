//! Per-trip start times, per-arc departure/arrival times, aggregate delay,
//! feasibility and tie flags.

use crate::instance::Instance;
use crate::types::{Position, TripId};

/// A full congested schedule plus the bookkeeping the engine needs to
/// decide whether it can be accepted.
///
/// Mutated exclusively by the forward simulator, the incremental
/// re-evaluator, and the tie resolver during a local search;
/// `Engine::construct`/`try_run` are the only ways to obtain or update one.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Solution {
    start_times: Vec<f64>,
    schedule: Vec<Vec<f64>>,
    remaining_slack: Vec<f64>,
    staggering_applied: Vec<f64>,
    total_delay: f64,
    infeasible: bool,
    has_ties: bool,
    non_improving: bool,
}

impl Solution {
    /// Allocates an empty schedule shaped after `instance`, with the given
    /// start times pinned at position 0 of every trip's route.
    pub fn new(instance: &Instance, start_times: Vec<f64>) -> Self {
        assert_eq!(start_times.len(), instance.num_trips());
        let schedule = (0..instance.num_trips())
            .map(|t| vec![0.0; instance.route_len(TripId::from(t))])
            .collect();
        let remaining_slack = (0..instance.num_trips())
            .map(|t| instance.latest(TripId::from(t), 0) - start_times[t])
            .collect();
        let staggering_applied = (0..instance.num_trips())
            .map(|t| start_times[t] - instance.release(TripId::from(t)))
            .collect();
        Self {
            start_times,
            schedule,
            remaining_slack,
            staggering_applied,
            total_delay: 0.0,
            infeasible: false,
            has_ties: false,
            non_improving: false,
        }
    }

    /// This trip's pinned start time, `s(t)`.
    pub fn start_time(&self, trip: TripId) -> f64 {
        self.start_times[trip.index()]
    }

    /// All start times, e.g. to feed back into [`crate::Engine::construct`].
    pub fn start_times(&self) -> &[f64] {
        &self.start_times
    }

    /// Departure time from `position` in `trip`'s schedule, `S(t, p)`.
    pub fn departure(&self, trip: TripId, position: Position) -> f64 {
        self.schedule[trip.index()][position]
    }

    /// Sets the departure time from `position` in `trip`'s schedule.
    pub fn set_departure(&mut self, trip: TripId, position: Position, time: f64) {
        self.schedule[trip.index()][position] = time;
    }

    /// The full per-trip schedule vector.
    pub fn schedule_of(&self, trip: TripId) -> &[f64] {
        &self.schedule[trip.index()]
    }

    /// Final arrival time of `trip` (`S(t, last)`).
    pub fn arrival(&self, trip: TripId) -> f64 {
        *self.schedule[trip.index()].last().unwrap()
    }

    /// `remaining_slack(t) = ℓ(t,0) − s(t)`.
    pub fn remaining_slack(&self, trip: TripId) -> f64 {
        self.remaining_slack[trip.index()]
    }

    /// `staggering(t) = s(t) − r(t)`.
    pub fn staggering(&self, trip: TripId) -> f64 {
        self.staggering_applied[trip.index()]
    }

    /// Shifts `trip`'s start time by `amount` (positive = stagger later,
    /// negative = destagger earlier), keeping slack/staggering bookkeeping
    /// consistent.
    pub fn shift_start_time(&mut self, trip: TripId, amount: f64) {
        self.start_times[trip.index()] += amount;
        self.remaining_slack[trip.index()] -= amount;
        self.staggering_applied[trip.index()] += amount;
    }

    /// Overwrites initial slack budgets; used by [`crate::Engine::try_run`]'s
    /// caller-supplied inputs.
    pub fn set_remaining_slack(&mut self, values: Vec<f64>) {
        self.remaining_slack = values;
    }

    /// Overwrites prior staggering-applied bookkeeping; used by
    /// [`crate::Engine::try_run`]'s caller-supplied inputs.
    pub fn set_staggering_applied(&mut self, values: Vec<f64>) {
        self.staggering_applied = values;
    }

    /// `total_delay = Σ_t [S(t, last) − s(t) − freeflow(t)]`.
    pub fn total_delay(&self) -> f64 {
        self.total_delay
    }

    /// Sets the aggregate total delay.
    pub fn set_total_delay(&mut self, value: f64) {
        self.total_delay = value;
    }

    /// Adds `delta` to the aggregate total delay.
    pub fn add_total_delay(&mut self, delta: f64) {
        self.total_delay += delta;
    }

    /// `total_delay + lb_travel_time`, the realized total travel time.
    pub fn total_travel_time(&self, instance: &Instance) -> f64 {
        self.total_delay + instance.lb_travel_time()
    }

    /// `true` if a data-model invariant is known to be violated, or a deadline was missed.
    pub fn is_infeasible(&self) -> bool {
        self.infeasible
    }

    /// Marks this solution infeasible.
    pub fn mark_infeasible(&mut self) {
        self.infeasible = true;
    }

    /// `true` if the tie resolver has not yet cleared every tie.
    pub fn has_ties(&self) -> bool {
        self.has_ties
    }

    /// Sets the tie flag.
    pub fn set_has_ties(&mut self, value: bool) {
        self.has_ties = value;
    }

    /// `true` if the most recent evaluation found this solution no better
    /// than the driver's current benchmark.
    pub fn is_non_improving(&self) -> bool {
        self.non_improving
    }

    /// Sets the non-improving flag.
    pub fn set_non_improving(&mut self, value: bool) {
        self.non_improving = value;
    }

    /// `true` iff feasible, tie-free, and not flagged non-improving — the
    /// admissibility check the driver applies before accepting a move
    /// (mirrors `check_if_solution_is_admissible`).
    pub fn is_admissible(&self) -> bool {
        !self.infeasible && !self.has_ties && !self.non_improving
    }

    /// Resets the benign flags ahead of a fresh evaluation.
    pub(crate) fn reset_flags(&mut self) {
        self.infeasible = false;
        self.has_ties = false;
        self.non_improving = false;
        self.total_delay = 0.0;
    }

    /// Serializes this solution to a JSON string.
    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> Result<String, crate::error::ScheduleError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses a solution previously written by [`Solution::to_json`].
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self, crate::error::ScheduleError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::delay::DelayShape;
    use crate::instance::Trip;
    use crate::types::Parameters;

    #[test]
    fn fresh_solution_tracks_slack_and_staggering() {
        let mut instance = Instance::new(DelayShape::new([]), Parameters::default());
        let arc = instance.add_arc(5.0, 1);
        instance.add_trip(Trip::with_windows(
            vec![arc],
            2.0,
            f64::INFINITY,
            vec![2.0, 7.0],
            vec![20.0, f64::INFINITY],
        ));
        let solution = Solution::new(&instance, vec![4.0]);
        let trip = TripId::from(0usize);
        assert_eq!(solution.remaining_slack(trip), 16.0);
        assert_eq!(solution.staggering(trip), 2.0);
    }
}
