//! Enumerates the pairwise conflicts along every delayed trip's route.
//!
//! Grounded on `cpp_module/src/modules/conflictSearcher.cpp`.

use crate::instance::Instance;
use crate::solution::Solution;
use crate::types::{ArcId, Position, TripId};

/// One pairwise conflict: `trip` is delayed on `arc` by `delay`, sharing the
/// arc with `other_trip`. `distance_to_cover` is how much `trip`'s departure
/// would have to move to stop overlapping `other_trip`'s presence window —
/// the local-search driver's staggering budget for this conflict.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Conflict {
    pub arc: ArcId,
    pub trip: TripId,
    pub position: Position,
    pub other_trip: TripId,
    pub delay: f64,
    pub distance_to_cover: f64,
    /// Cumulative amount `trip` has been staggered later while resolving this conflict.
    pub staggering_applied: f64,
    /// Cumulative amount `other_trip` has been destaggered earlier while resolving this conflict.
    pub destaggering_applied: f64,
}

enum Instruction {
    Continue,
    AddConflict,
    Break,
}

/// Lists every conflict contributing to a trip's delay on an arc, across the
/// whole schedule, ordered by descending delay then descending trip id (the
/// driver's search order, grounded on `compareConflicts`).
pub(crate) fn find_conflicts(instance: &Instance, solution: &Solution) -> Vec<Conflict> {
    let mut conflicts = Vec::new();

    for t in 0..instance.num_trips() {
        let trip = TripId::from(t);
        if !trip_has_delay(instance, solution, trip) {
            continue;
        }
        for position in 0..instance.route_len(trip) - 1 {
            let arc = instance.route_at(trip, position);
            let departure = solution.departure(trip, position);
            let arrival = solution.departure(trip, position + 1);
            let delay = arrival - departure - instance.travel_time(arc);
            if delay <= instance.parameters().numeric_tolerance {
                continue;
            }
            conflicts.extend(conflicts_on_arc(instance, solution, trip, position, arc));
        }
    }

    conflicts.sort_by(|a, b| {
        b.delay
            .partial_cmp(&a.delay)
            .unwrap()
            .then(b.trip.0.cmp(&a.trip.0))
    });
    conflicts
}

fn trip_has_delay(instance: &Instance, solution: &Solution, trip: TripId) -> bool {
    let congested = solution.arrival(trip) - solution.start_time(trip);
    congested - instance.free_flow(trip) > instance.parameters().numeric_tolerance
}

fn conflicts_on_arc(
    instance: &Instance,
    solution: &Solution,
    trip: TripId,
    position: Position,
    arc: ArcId,
) -> Vec<Conflict> {
    let departure = solution.departure(trip, position);
    let current_earliest = instance.earliest(trip, position);
    let current_latest = instance.latest(trip, position);

    let mut arrivals: Vec<(TripId, f64)> = Vec::new();
    for &other in instance.conflicting_set(arc) {
        if other == trip {
            continue;
        }
        let other_position = instance
            .position_of(other, arc)
            .expect("conflicting set member must route through this arc");
        match instruction(instance, solution, trip, current_earliest, current_latest, departure, other, other_position) {
            Instruction::Continue => continue,
            Instruction::Break => break,
            Instruction::AddConflict => {
                arrivals.push((other, solution.departure(other, other_position + 1)));
            }
        }
    }
    arrivals.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap());

    let mut flow = 1.0;
    arrivals
        .into_iter()
        .map(|(other, other_arrival)| {
            flow += 1.0;
            Conflict {
                arc,
                trip,
                position,
                other_trip: other,
                delay: instance.delay(arc, flow),
                distance_to_cover: other_arrival - departure + instance.parameters().tie_tolerance,
                staggering_applied: 0.0,
                destaggering_applied: 0.0,
            }
        })
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn instruction(
    instance: &Instance,
    solution: &Solution,
    trip: TripId,
    current_earliest: f64,
    current_latest: f64,
    departure: f64,
    other: TripId,
    other_position: Position,
) -> Instruction {
    let other_earliest = instance.earliest(other, other_position);
    let other_latest = instance.latest(other, other_position + 1);

    let other_comes_before_and_cannot_overlap = other_latest <= current_earliest;
    let other_comes_before_and_can_overlap = other_earliest <= current_earliest && current_earliest <= other_latest;
    let other_comes_after_and_can_overlap = current_earliest <= other_earliest && other_earliest <= current_latest;
    let other_comes_after_and_cannot_overlap = other_earliest >= current_latest;

    if other_comes_before_and_cannot_overlap {
        Instruction::Continue
    } else if other_comes_before_and_can_overlap || other_comes_after_and_can_overlap {
        let other_departure = solution.departure(other, other_position);
        let other_arrival = solution.departure(other, other_position + 1);
        let conflicts = other_departure <= departure && departure < other_arrival;
        if conflicts {
            Instruction::AddConflict
        } else {
            Instruction::Continue
        }
    } else if other_comes_after_and_cannot_overlap {
        Instruction::Break
    } else {
        unreachable!("conflict window: undefined case")
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::delay::DelayShape;
    use crate::instance::Trip;
    use crate::simulator::Simulator;
    use crate::types::Parameters;

    #[test]
    fn no_conflicts_when_no_delay() {
        let mut instance = Instance::new(DelayShape::new([(0.5, 1.0)]), Parameters::default());
        let arc = instance.add_arc(5.0, 4);
        instance.add_trip(Trip::new(vec![arc], 0.0, f64::INFINITY));
        instance.populate_conflicting_sets();
        let mut sim = Simulator::new(&instance);
        let solution = sim.construct(&instance, vec![0.0], f64::INFINITY);
        assert!(find_conflicts(&instance, &solution).is_empty());
    }

    #[test]
    fn overlapping_trips_produce_a_conflict() {
        let mut instance = Instance::new(DelayShape::new([(0.5, 1.0)]), Parameters::default());
        let arc = instance.add_arc(6.0, 1);
        instance.add_trip(Trip::new(vec![arc], 0.0, f64::INFINITY));
        instance.add_trip(Trip::new(vec![arc], 0.0, f64::INFINITY));
        instance.populate_conflicting_sets();
        let mut sim = Simulator::new(&instance);
        let solution = sim.construct(&instance, vec![0.0, 0.0], f64::INFINITY);
        let conflicts = find_conflicts(&instance, &solution);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].arc, arc);
    }

    #[test]
    fn three_way_pile_up_delays_every_trip_but_the_first() {
        use maplit::hashset;

        let mut instance = Instance::new(DelayShape::new([(0.5, 1.0)]), Parameters::default());
        let arc = instance.add_arc(6.0, 1);
        instance.add_trip(Trip::new(vec![arc], 0.0, f64::INFINITY));
        let t1 = instance.add_trip(Trip::new(vec![arc], 0.0, f64::INFINITY));
        let t2 = instance.add_trip(Trip::new(vec![arc], 0.0, f64::INFINITY));
        instance.populate_conflicting_sets();
        let mut sim = Simulator::new(&instance);
        let solution = sim.construct(&instance, vec![0.0, 0.0, 0.0], f64::INFINITY);

        let delayed_trips: std::collections::HashSet<TripId> =
            find_conflicts(&instance, &solution).into_iter().map(|c| c.trip).collect();
        assert_eq!(
            delayed_trips,
            hashset! {t1, t2},
            "the trip that goes first through a single-capacity arc is never the delayed side of a conflict"
        );
    }
}
