//! The local-search driver: repeatedly finds the worst conflict, staggers or
//! destaggers trips to resolve it, and keeps the move only if it leaves the
//! schedule feasible, tie-free, and no worse than before.
//!
//! Grounded on `cpp_module/src/modules/local_search.cpp`'s `LocalSearch::run`,
//! `improve_solution`, `solve_conflict`, `apply_staggering_to_solve_conflict`
//! and `update_distance_to_cover`.

use std::time::{Duration, Instant};

use log::{debug, info};

use crate::conflict::{self, Conflict};
use crate::error::ScheduleError;
use crate::incremental::Incremental;
use crate::instance::Instance;
use crate::simulator::Simulator;
use crate::solution::Solution;
use crate::stats::SearchStats;
use crate::tie;
use crate::types::TripId;

/// Owns the scratch state shared across one local-search run: the forward
/// simulator (full reconstructions), the incremental re-evaluator (per-move
/// updates), and the run's counters.
#[derive(Debug)]
pub(crate) struct Driver {
    simulator: Simulator,
    incremental: Incremental,
    stats: SearchStats,
    /// Counts incremental re-evaluations across the whole run; drives the
    /// periodic full-resync cadence the same way `Scheduler::iteration` does.
    iterations: u64,
}

impl Driver {
    pub(crate) fn new(instance: &Instance) -> Self {
        Self {
            simulator: Simulator::new(instance),
            incremental: Incremental::new(instance),
            stats: SearchStats::default(),
            iterations: 0,
        }
    }

    pub(crate) fn stats(&self) -> SearchStats {
        self.stats
    }

    /// Runs the improvement loop from `start_times` until no conflict
    /// remains, the wall-clock budget runs out, or no conflict can be
    /// resolved any further.
    pub(crate) fn try_run(&mut self, instance: &Instance, start_times: Vec<f64>) -> Result<Solution, ScheduleError> {
        let mut solution = self.simulator.construct(instance, start_times, f64::INFINITY);
        info!(
            "local search: received a schedule with {:.2}s of delay",
            solution.total_delay()
        );

        if solution.is_infeasible() {
            info!("local search: initial schedule is infeasible, stopping");
            return Ok(solution);
        }

        solution.set_has_ties(tie::solution_has_ties(instance, &solution));
        if solution.has_ties() {
            self.stats.record_tie_detected();
            solution = tie::resolve_ties(instance, &mut self.simulator, solution, f64::INFINITY);
        }

        let budget = instance.parameters().max_time_optimization.max(0.0);
        let deadline = if budget.is_finite() {
            Instant::now() + Duration::from_secs_f64(budget)
        } else {
            Instant::now() + Duration::from_secs(86_400)
        };

        loop {
            if Instant::now() >= deadline {
                debug!("local search: wall-clock budget exhausted, stopping");
                break;
            }
            let best_total_delay = solution.total_delay();
            let conflicts = conflict::find_conflicts(instance, &solution);
            if conflicts.is_empty() {
                break;
            }
            if !self.improve(instance, &mut solution, conflicts, best_total_delay, deadline) {
                break;
            }
        }

        solution = self.simulator.construct(instance, solution.start_times().to_vec(), f64::INFINITY);
        if solution.total_delay() < -instance.parameters().numeric_tolerance {
            return Err(ScheduleError::NegativeTotalDelay {
                total_delay: solution.total_delay(),
            });
        }
        Ok(solution)
    }

    /// Tries every conflict in descending-delay order, committing the first
    /// move that resolves one without making the schedule worse. `current`
    /// is updated in place; returns `false` if nothing could be improved.
    fn improve(
        &mut self,
        instance: &Instance,
        current: &mut Solution,
        conflicts: Vec<Conflict>,
        best_total_delay: f64,
        deadline: Instant,
    ) -> bool {
        let mut attempt = current.clone();
        for mut conflict in conflicts {
            if conflict.distance_to_cover.abs() < instance.parameters().numeric_tolerance {
                continue;
            }
            self.stats.record_explored();

            let (resolved, slack_was_enough) =
                self.solve_conflict(instance, attempt, &mut conflict, best_total_delay, deadline);
            attempt = resolved;

            if Instant::now() >= deadline {
                return false;
            }

            if slack_was_enough && attempt.is_admissible() {
                self.stats.record_accepted();
                let resync_period = instance.parameters().resync_period;
                if resync_period > 0 && self.iterations % u64::from(resync_period) == 0 {
                    self.stats.record_resync();
                    attempt = self.simulator.construct(instance, attempt.start_times().to_vec(), best_total_delay);
                }
                if (current.total_delay() - attempt.total_delay()).abs() > instance.parameters().numeric_tolerance {
                    debug!(
                        "driver: staggering trip={} by {:.2}; destaggering trip={} by {:.2}; new total delay: {:.2}",
                        conflict.trip,
                        conflict.staggering_applied,
                        conflict.other_trip,
                        conflict.destaggering_applied,
                        attempt.total_delay()
                    );
                }
                *current = attempt;
                return true;
            }

            attempt = current.clone();
        }
        false
    }

    /// Repeatedly applies [`apply_staggering`] and re-evaluates until the
    /// conflict's `distance_to_cover` is closed, slack runs out, the
    /// re-evaluation makes the schedule inadmissible, or the deadline hits.
    /// Returns the (possibly unchanged) solution and whether slack was ever
    /// found insufficient.
    fn solve_conflict(
        &mut self,
        instance: &Instance,
        mut solution: Solution,
        conflict: &mut Conflict,
        best_total_delay: f64,
        deadline: Instant,
    ) -> (Solution, bool) {
        let tol = instance.parameters().tie_tolerance;
        loop {
            if conflict.distance_to_cover <= tol {
                return (solution, true);
            }
            if Instant::now() >= deadline {
                return (solution, true);
            }

            let slack_is_enough = solution.remaining_slack(conflict.trip) + solution.staggering(conflict.other_trip)
                > conflict.distance_to_cover;
            if !slack_is_enough {
                self.stats.record_slack_not_enough();
                return (solution, false);
            }

            let original = solution.clone();
            let changed = apply_staggering(&mut solution, conflict);
            self.iterations += 1;
            solution = self.incremental.reevaluate(instance, &original, solution, &changed, best_total_delay);
            if !solution.is_admissible() {
                return (solution, true);
            }
            update_distance_to_cover(instance, &solution, conflict);
        }
    }
}

/// Moves `conflict.trip` later (and, if its own slack doesn't cover the full
/// distance, `conflict.other_trip` earlier) to close `distance_to_cover`.
/// Mirrors `apply_staggering_to_solve_conflict`'s `move_vehicle_one` /
/// `move_both_vehicles` branching.
fn apply_staggering(solution: &mut Solution, conflict: &mut Conflict) -> Vec<TripId> {
    let slack = solution.remaining_slack(conflict.trip);
    let distance = conflict.distance_to_cover;

    if distance < slack {
        solution.shift_start_time(conflict.trip, distance);
        conflict.staggering_applied += distance;
        vec![conflict.trip]
    } else {
        let staggering = slack.max(0.0);
        let destaggering = distance - staggering;
        solution.shift_start_time(conflict.trip, staggering);
        solution.shift_start_time(conflict.other_trip, -destaggering);
        conflict.staggering_applied += staggering;
        conflict.destaggering_applied += destaggering;
        vec![conflict.trip, conflict.other_trip]
    }
}

/// Recomputes `distance_to_cover` from the just-updated schedule: how much
/// farther `trip`'s departure still overlaps `other_trip`'s presence window.
fn update_distance_to_cover(instance: &Instance, solution: &Solution, conflict: &mut Conflict) {
    let other_position = instance
        .position_of(conflict.other_trip, conflict.arc)
        .expect("conflicting trip must route through this arc");
    let other_arrival = solution.departure(conflict.other_trip, other_position + 1);
    let current_departure = solution.departure(conflict.trip, conflict.position);
    conflict.distance_to_cover = other_arrival - current_departure - instance.parameters().tie_tolerance;
}
