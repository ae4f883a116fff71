//! Deterministic tie resolution: nudges one trip of a tied pair forward by
//! `tie_tolerance` and reconstructs, reverting if that makes the schedule
//! worse (spec-equivalent of `cpp_module/src/modules/tie_manager.cpp`).

use itertools::Itertools;
use log::debug;

use crate::instance::Instance;
use crate::simulator::Simulator;
use crate::solution::Solution;
use crate::types::{ArcId, Position, TripId};

#[derive(Debug, Clone, Copy)]
struct Tie {
    one: TripId,
    two: TripId,
    position_one: Position,
    position_two: Position,
}

/// `true` if `one` and `two` are tied on `arc` (depart together, or one
/// arrives exactly as the other departs).
fn has_tie(solution: &Solution, tie: &Tie, tol: f64) -> bool {
    let depart_together =
        (solution.departure(tie.one, tie.position_one) - solution.departure(tie.two, tie.position_two)).abs() < tol;
    let one_arrives_as_two_departs = (solution.departure(tie.two, tie.position_two)
        - solution.departure(tie.one, tie.position_one + 1))
    .abs()
        < tol;
    let two_arrives_as_one_departs = (solution.departure(tie.one, tie.position_one)
        - solution.departure(tie.two, tie.position_two + 1))
    .abs()
        < tol;
    depart_together || one_arrives_as_two_departs || two_arrives_as_one_departs
}

/// Every unordered pair sharing `arc`, `one` always the one with the
/// earlier earliest-departure (the conflicting set's sort order), since
/// that's the trip [`resolve_single_tie`] nudges forward to break the tie.
fn ties_on_arc(instance: &Instance, arc: ArcId) -> Vec<Tie> {
    instance
        .conflicting_set(arc)
        .iter()
        .copied()
        .tuple_combinations()
        .map(|(one, two)| Tie {
            one,
            two,
            position_one: instance.position_of(one, arc).unwrap(),
            position_two: instance.position_of(two, arc).unwrap(),
        })
        .collect()
}

/// `true` if any two trips sharing an arc are tied (used to set
/// [`Solution::has_ties`] without attempting to resolve anything).
pub(crate) fn solution_has_ties(instance: &Instance, solution: &Solution) -> bool {
    let tol = instance.parameters().tie_tolerance - instance.parameters().numeric_tolerance;
    for a in 1..instance.num_arcs() {
        let arc = ArcId::from(a);
        if instance.conflicting_set(arc).is_empty() {
            continue;
        }
        for tie in ties_on_arc(instance, arc) {
            if has_tie(solution, &tie, tol) {
                return true;
            }
        }
    }
    false
}

/// Resolves every tie in `solution` by repeatedly staggering the
/// lower-position trip by `tie_tolerance` and reconstructing, reverting a
/// nudge that turns the schedule infeasible or non-improving.
pub(crate) fn resolve_ties(
    instance: &Instance,
    simulator: &mut Simulator,
    mut solution: Solution,
    best_total_delay: f64,
) -> Solution {
    solution.set_has_ties(false);
    let tie_tolerance = instance.parameters().tie_tolerance;
    let tol = tie_tolerance - instance.parameters().numeric_tolerance;

    for a in 1..instance.num_arcs() {
        let arc = ArcId::from(a);
        if instance.conflicting_set(arc).is_empty() {
            continue;
        }
        for tie in ties_on_arc(instance, arc) {
            solution = resolve_single_tie(instance, simulator, solution, &tie, tol, tie_tolerance, best_total_delay);
        }
    }

    solution
}

fn resolve_single_tie(
    instance: &Instance,
    simulator: &mut Simulator,
    mut solution: Solution,
    tie: &Tie,
    tol: f64,
    tie_tolerance: f64,
    best_total_delay: f64,
) -> Solution {
    loop {
        if !has_tie(&solution, tie, tol) {
            return solution;
        }
        let slack = instance.latest(tie.one, 0) - solution.start_time(tie.one);
        if slack <= instance.parameters().numeric_tolerance {
            return solution;
        }

        let checkpoint = solution.clone();
        solution.shift_start_time(tie.one, tie_tolerance);
        let nudged = simulator.construct(instance, solution.start_times().to_vec(), best_total_delay);

        if !nudged.is_admissible() {
            debug!(
                "tie: nudging trip={} by {tie_tolerance} made the schedule inadmissible, reverting",
                tie.one
            );
            return checkpoint;
        }
        debug!("tie: resolved trip={} vs trip={} on arc", tie.one, tie.two);
        solution = nudged;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::delay::DelayShape;
    use crate::instance::Trip;
    use crate::types::Parameters;

    #[test]
    fn no_ties_when_start_times_differ_substantially() {
        let mut instance = Instance::new(DelayShape::new([(0.5, 1.0)]), Parameters::default());
        let arc = instance.add_arc(5.0, 2);
        instance.add_trip(Trip::new(vec![arc], 0.0, f64::INFINITY));
        instance.add_trip(Trip::new(vec![arc], 10.0, f64::INFINITY));
        instance.populate_conflicting_sets();
        let mut sim = Simulator::new(&instance);
        let solution = sim.construct(&instance, vec![0.0, 10.0], f64::INFINITY);
        assert!(!solution_has_ties(&instance, &solution));
    }

    #[test]
    fn simultaneous_departure_is_a_tie() {
        let mut instance = Instance::new(DelayShape::new([(0.5, 1.0)]), Parameters::default());
        let arc = instance.add_arc(5.0, 2);
        instance.add_trip(Trip::new(vec![arc], 0.0, f64::INFINITY));
        instance.add_trip(Trip::new(vec![arc], 0.0, f64::INFINITY));
        instance.populate_conflicting_sets();
        let mut sim = Simulator::new(&instance);
        let solution = sim.construct(&instance, vec![0.0, 0.0], f64::INFINITY);
        assert!(solution_has_ties(&instance, &solution));
    }

    #[test]
    fn resolve_ties_clears_the_flag_when_slack_allows() {
        let mut instance = Instance::new(DelayShape::new([(0.5, 1.0)]), Parameters::default());
        let arc = instance.add_arc(5.0, 2);
        instance.add_trip(Trip::with_windows(
            vec![arc],
            0.0,
            f64::INFINITY,
            vec![0.0, 0.0],
            vec![100.0, f64::INFINITY],
        ));
        instance.add_trip(Trip::with_windows(
            vec![arc],
            0.0,
            f64::INFINITY,
            vec![0.0, 0.0],
            vec![100.0, f64::INFINITY],
        ));
        instance.populate_conflicting_sets();
        let mut sim = Simulator::new(&instance);
        let solution = sim.construct(&instance, vec![0.0, 0.0], f64::INFINITY);
        assert!(solution_has_ties(&instance, &solution));

        let resolved = resolve_ties(&instance, &mut sim, solution, f64::INFINITY);
        assert!(!solution_has_ties(&instance, &resolved));
    }
}
