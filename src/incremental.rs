//! Incremental re-evaluation of a schedule after one or two trips' start
//! times change, touching only the trips actually affected by the change.
//!
//! Grounded on `cpp_module/include/scheduler.h` and
//! `cpp_module/src/modules/update_solution/{main,conflicts,marking,helpers,departures,initialization}.cpp`.

use std::collections::BinaryHeap;

use log::{debug, trace};

use crate::event::{Departure, EventKind, MarkDecision, TripStatus};
use crate::instance::Instance;
use crate::solution::Solution;
use crate::types::{ArcId, Position, TripId};

enum ConflictWindow {
    /// The other trip's instance-level window is entirely before the current
    /// trip's and cannot overlap; keep scanning the (sorted) conflicting set.
    Continue,
    /// The windows may overlap; evaluate actual schedule times.
    Evaluate,
    /// The other trip's window is entirely after the current trip's; since
    /// the conflicting set is sorted by earliest window, nothing further
    /// can overlap either.
    Break,
}

/// Reusable scratch state for incremental re-evaluation, reserved once per
/// engine and reset between invocations.
#[derive(Debug, Default)]
pub(crate) struct Incremental {
    queue: BinaryHeap<Departure>,
    status: Vec<TripStatus>,
    last_processed: Vec<Option<Position>>,
    reinsertions: Vec<u32>,
    waiting: Vec<TripId>,
}

impl Incremental {
    pub(crate) fn new(instance: &Instance) -> Self {
        let mut s = Self::default();
        s.resize_for(instance);
        s
    }

    fn resize_for(&mut self, instance: &Instance) {
        let n = instance.num_trips();
        self.status = vec![TripStatus::Inactive; n];
        self.last_processed = vec![None; n];
        self.reinsertions = vec![0; n];
        self.queue.clear();
        self.waiting.clear();
    }

    /// Re-evaluates `solution` (whose `changed_trips` already carry their new
    /// start times, and whose schedule is otherwise a copy of `original`)
    /// against `original`, the pre-move baseline used for all "did it used
    /// to overlap" comparisons.
    pub(crate) fn reevaluate(
        &mut self,
        instance: &Instance,
        original: &Solution,
        mut solution: Solution,
        changed_trips: &[TripId],
        best_total_delay: f64,
    ) -> Solution {
        self.resize_for(instance);
        solution.reset_flags();
        solution.set_total_delay(original.total_delay());

        for &trip in changed_trips {
            let time = solution.start_time(trip);
            solution.set_departure(trip, 0, time);
            self.queue.push(Departure {
                time: ordered_float::NotNan::new(time).expect("start time must not be NaN"),
                arc: instance.route_at(trip, 0),
                trip,
                position: 0,
                kind: EventKind::Travel,
                reinsertion: 0,
            });
        }

        while let Some(mut departure) = self.queue.pop() {
            if departure.arc.is_dummy() {
                continue;
            }
            if self.should_skip(&departure) {
                trace!("reevaluate: skipping stale departure for {}", departure.trip);
                continue;
            }
            self.activate_if_staging(&mut departure);

            solution.set_departure(departure.trip, departure.position, departure.time.into_inner());
            self.waiting.clear();

            let outcome = self.scan_conflicting_set(instance, original, &mut solution, &departure);
            match outcome {
                ScanOutcome::Lazy => {
                    self.queue.push(departure);
                    continue;
                }
                ScanOutcome::Flow(flow) => {
                    let delay = instance.delay(departure.arc, flow);
                    let arrival = departure.time.into_inner() + instance.travel_time(departure.arc) + delay;
                    if arrival
                        > instance.latest(departure.trip, departure.position + 1)
                            + instance.parameters().numeric_tolerance
                    {
                        solution.mark_infeasible();
                        debug!("reevaluate: trip={} misses deadline, aborting", departure.trip);
                        return solution;
                    }
                    self.mark_waiting_trips(instance, original, &solution, &departure, arrival);

                    solution.set_departure(departure.trip, departure.position + 1, arrival);
                    self.last_processed[departure.trip.index()] = Some(departure.position);

                    if departure.position + 1 < instance.route_len(departure.trip) {
                        self.queue.push(Departure {
                            time: ordered_float::NotNan::new(arrival).unwrap(),
                            arc: instance.route_at(departure.trip, departure.position + 1),
                            trip: departure.trip,
                            position: departure.position + 1,
                            kind: EventKind::Travel,
                            reinsertion: departure.reinsertion,
                        });
                    }
                }
            }
        }

        self.finalize_total_delay(instance, original, &mut solution);
        if solution.total_delay() >= best_total_delay {
            solution.set_non_improving(true);
        }
        solution
    }

    fn should_skip(&self, departure: &Departure) -> bool {
        match departure.kind {
            EventKind::Activation => self.status[departure.trip.index()] == TripStatus::Active,
            EventKind::Travel => {
                let next_expected = match self.last_processed[departure.trip.index()] {
                    Some(p) => p + 1,
                    None => 0,
                };
                departure.position != next_expected
                    || departure.reinsertion != self.reinsertions[departure.trip.index()]
            }
        }
    }

    fn activate_if_staging(&mut self, departure: &mut Departure) {
        if departure.kind != EventKind::Activation {
            return;
        }
        let t = departure.trip.index();
        debug_assert_ne!(self.status[t], TripStatus::Inactive);
        if self.status[t] == TripStatus::Staging {
            departure.kind = EventKind::Travel;
            self.status[t] = TripStatus::Active;
            self.last_processed[t] = departure.position.checked_sub(1);
        }
    }

    /// Scans `arc`'s conflicting set (already sorted by instance-window
    /// earliest departure), computing `arc`'s flow and, as a side effect,
    /// marking newly-relevant inactive trips and reinserting stale active
    /// ones.
    fn scan_conflicting_set(
        &mut self,
        instance: &Instance,
        original: &Solution,
        solution: &mut Solution,
        departure: &Departure,
    ) -> ScanOutcome {
        if instance.conflicting_set(departure.arc).is_empty() {
            return ScanOutcome::Flow(1.0);
        }

        let tol = instance.parameters().numeric_tolerance;
        let mut flow = 1.0_f64;
        let mut lazy = false;

        for &other in instance.conflicting_set(departure.arc) {
            if other == departure.trip {
                continue;
            }
            let other_position = instance
                .position_of(other, departure.arc)
                .expect("conflicting set member must route through this arc");

            match window_instruction(instance, departure.trip, departure.position, other, other_position, tol) {
                ConflictWindow::Continue => continue,
                ConflictWindow::Break => break,
                ConflictWindow::Evaluate => {}
            }

            let other_departure = solution.departure(other, other_position);
            let other_arrival = solution.departure(other, other_position + 1);
            let conflicts_with_other = overlaps(
                other_departure,
                other_arrival,
                departure.time.into_inner(),
                departure.trip,
                other,
                tol,
            );

            match self.status[other.index()] {
                TripStatus::Active => {
                    let other_processed = self.last_processed[other.index()]
                        .map_or(false, |p| other_position <= p);
                    if other_processed {
                        let other_is_first = is_first_in_current(
                            other_departure,
                            departure.time.into_inner(),
                            other,
                            departure.trip,
                            tol,
                        );
                        if !other_is_first {
                            self.reinsert(original, solution, departure.arc, other, other_position);
                            continue;
                        }
                        if conflicts_with_other {
                            flow += 1.0;
                        }
                    }
                }
                TripStatus::Inactive | TripStatus::Staging => {
                    if conflicts_with_other {
                        flow += 1.0;
                    }
                    match mark_decision(
                        original,
                        departure,
                        other,
                        other_position,
                        conflicts_with_other,
                        tol,
                    ) {
                        MarkDecision::Mark => {
                            self.mark(departure.arc, other, other_position, other_departure);
                            lazy = true;
                        }
                        MarkDecision::Wait => self.waiting.push(other),
                        MarkDecision::NoMark => {}
                    }
                }
            }
        }

        if lazy {
            ScanOutcome::Lazy
        } else {
            ScanOutcome::Flow(flow)
        }
    }

    fn mark(&mut self, arc: ArcId, trip: TripId, position: Position, time: f64) {
        self.status[trip.index()] = TripStatus::Staging;
        self.queue.push(Departure {
            time: ordered_float::NotNan::new(time).unwrap(),
            arc,
            trip,
            position,
            kind: EventKind::Activation,
            reinsertion: 0,
        });
    }

    /// Rewinds `other` back to `other_position`: resets every schedule entry
    /// downstream of it to the pre-move baseline, since those entries were
    /// computed assuming an order that the current trip's move just broke,
    /// and reinserts it into the queue with a bumped reinsertion counter so
    /// any already-queued (now stale) event for it is dropped on pop.
    fn reinsert(
        &mut self,
        original: &Solution,
        solution: &mut Solution,
        arc: ArcId,
        other: TripId,
        other_position: Position,
    ) {
        let reset_time = solution.departure(other, other_position);
        if let Some(last) = self.last_processed[other.index()] {
            for position in (other_position + 1)..=last {
                let baseline = original.departure(other, position);
                solution.set_departure(other, position, baseline);
            }
        }
        self.reinsertions[other.index()] += 1;
        let reinsertion = self.reinsertions[other.index()];
        self.last_processed[other.index()] = other_position.checked_sub(1);
        self.queue.push(Departure {
            time: ordered_float::NotNan::new(reset_time).unwrap(),
            arc,
            trip: other,
            position: other_position,
            kind: EventKind::Travel,
            reinsertion,
        });
    }

    fn mark_waiting_trips(
        &mut self,
        instance: &Instance,
        original: &Solution,
        solution: &Solution,
        departure: &Departure,
        new_arrival: f64,
    ) {
        let tol = instance.parameters().numeric_tolerance;
        let waiting = std::mem::take(&mut self.waiting);
        for other in waiting {
            let other_position = instance
                .position_of(other, departure.arc)
                .expect("conflicting set member must route through this arc");
            if should_mark_given_arrival(original, departure, other, other_position, new_arrival, tol) {
                let other_departure = solution.departure(other, other_position);
                self.mark(departure.arc, other, other_position, other_departure);
            }
        }
    }

    fn finalize_total_delay(&self, instance: &Instance, original: &Solution, solution: &mut Solution) {
        for t in 0..instance.num_trips() {
            if self.status[t] != TripStatus::Active {
                continue;
            }
            let trip = TripId::from(t);
            let free_flow = instance.free_flow(trip);
            let old_delay = original.arrival(trip) - original.start_time(trip) - free_flow;
            let new_delay = solution.arrival(trip) - solution.start_time(trip) - free_flow;
            solution.add_total_delay(new_delay - old_delay);
        }
    }
}

enum ScanOutcome {
    Flow(f64),
    Lazy,
}

fn comes_before(a: f64, b: f64, id_a: TripId, id_b: TripId, tol: f64) -> bool {
    a < b - tol || ((a - b).abs() <= tol && id_a.0 < id_b.0)
}

fn comes_after(a: f64, b: f64, id_a: TripId, id_b: TripId, tol: f64) -> bool {
    a > b + tol || ((a - b).abs() <= tol && id_a.0 > id_b.0)
}

/// Prunes the conflicting-set scan using instance-level (not schedule)
/// windows, since the set is sorted by ascending earliest window.
fn window_instruction(
    instance: &Instance,
    trip: TripId,
    position: Position,
    other: TripId,
    other_position: Position,
    tol: f64,
) -> ConflictWindow {
    let current_earliest = instance.earliest(trip, position);
    let current_latest = instance.latest(trip, position + 1);
    let other_earliest = instance.earliest(other, other_position);
    let other_latest = instance.latest(other, other_position + 1);

    if comes_before(other_latest, current_earliest, other, trip, tol) {
        ConflictWindow::Continue
    } else if (comes_before(other_earliest, current_earliest, other, trip, tol)
        && !comes_before(other_latest, current_earliest, other, trip, tol))
        || (comes_after(other_earliest, current_earliest, other, trip, tol)
            && comes_before(current_earliest, other_latest, trip, other, tol))
    {
        ConflictWindow::Evaluate
    } else if comes_after(other_earliest, current_latest, other, trip, tol) {
        ConflictWindow::Break
    } else {
        unreachable!("window_instruction: no case covers this pair of windows")
    }
}

/// Whether `time` (the current trip's instant on the arc) falls within
/// `[other_departure, other_arrival)`, with a deterministic tie-break by id.
fn overlaps(other_departure: f64, other_arrival: f64, time: f64, trip: TripId, other: TripId, tol: f64) -> bool {
    if (other_departure - time).abs() <= tol && trip.0 < other.0 {
        return false;
    }
    other_departure - tol <= time && time < other_arrival + tol
}

fn is_first_in_original(other_departure: f64, current_departure: f64, other: TripId, trip: TripId, tol: f64) -> bool {
    if (other_departure - current_departure).abs() <= tol && trip.0 < other.0 {
        return false;
    }
    other_departure <= current_departure
}

fn is_first_in_current(other_departure: f64, current_time: f64, other: TripId, trip: TripId, tol: f64) -> bool {
    if (other_departure - current_time).abs() <= tol && trip.0 < other.0 {
        return false;
    }
    other_departure <= current_time
}

#[allow(clippy::too_many_arguments)]
fn mark_decision(
    original: &Solution,
    departure: &Departure,
    other: TripId,
    other_position: Position,
    current_conflicts_with_other: bool,
    tol: f64,
) -> MarkDecision {
    let other_original_departure = original.departure(other, other_position);
    let current_original_departure = original.departure(departure.trip, departure.position);
    let current_original_arrival = original.departure(departure.trip, departure.position + 1);

    let other_was_originally_first = is_first_in_original(
        other_original_departure,
        current_original_departure,
        other,
        departure.trip,
        tol,
    );
    let other_overlapped_with_current = overlaps(
        current_original_departure,
        current_original_arrival,
        other_original_departure,
        other,
        departure.trip,
        tol,
    );
    let other_is_first_now =
        is_first_in_current(other_original_departure, departure.time.into_inner(), other, departure.trip, tol);

    let current_was_originally_first = !other_was_originally_first;
    let current_is_first_now = !other_is_first_now;

    let other_always_first = other_was_originally_first && other_is_first_now;
    let switch_other_with_current_order = current_was_originally_first && other_is_first_now;
    let switch_current_with_other_order = other_was_originally_first && current_is_first_now;
    let current_always_first = current_was_originally_first && current_is_first_now;

    if other_always_first {
        MarkDecision::NoMark
    } else if switch_other_with_current_order {
        if !other_overlapped_with_current && !current_conflicts_with_other {
            MarkDecision::NoMark
        } else {
            MarkDecision::Mark
        }
    } else if switch_current_with_other_order || current_always_first {
        MarkDecision::Wait
    } else {
        unreachable!("mark decision: trip ordering must fall into one of the four cases")
    }
}

#[allow(clippy::too_many_arguments)]
fn should_mark_given_arrival(
    original: &Solution,
    departure: &Departure,
    other: TripId,
    other_position: Position,
    current_new_arrival: f64,
    tol: f64,
) -> bool {
    let other_original_departure = original.departure(other, other_position);
    let other_original_arrival = original.departure(other, other_position + 1);
    let current_original_departure = original.departure(departure.trip, departure.position);
    let current_original_arrival = original.departure(departure.trip, departure.position + 1);

    let current_overlapped_with_other = overlaps(
        other_original_departure,
        other_original_arrival,
        current_original_departure,
        departure.trip,
        other,
        tol,
    );
    let other_overlapped_with_current = overlaps(
        current_original_departure,
        current_original_arrival,
        other_original_departure,
        other,
        departure.trip,
        tol,
    );
    let other_overlaps_now_with_current = overlaps(
        departure.time.into_inner(),
        current_new_arrival,
        other_original_departure,
        other,
        departure.trip,
        tol,
    );

    let other_is_originally_first =
        is_first_in_original(other_original_departure, current_original_departure, other, departure.trip, tol);
    let other_is_first_now =
        is_first_in_current(other_original_departure, departure.time.into_inner(), other, departure.trip, tol);

    let switch_current_with_other_order = other_is_originally_first && !other_is_first_now;
    let vehicles_never_overlapped = !current_overlapped_with_other && !other_overlaps_now_with_current;
    let current_always_first = !other_is_originally_first && !other_is_first_now;
    let other_always_overlaps = other_overlapped_with_current && other_overlaps_now_with_current;

    if switch_current_with_other_order {
        !vehicles_never_overlapped
    } else if current_always_first {
        !other_always_overlaps
    } else {
        unreachable!("should-mark: trip ordering must fall into one of the two cases")
    }
}

#[cfg(test)]
mod test {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::delay::DelayShape;
    use crate::instance::Trip;
    use crate::simulator::Simulator;
    use crate::types::Parameters;

    fn two_trip_instance() -> Instance {
        let mut instance = Instance::new(DelayShape::new([(0.5, 1.0)]), Parameters::default());
        let arc = instance.add_arc(6.0, 1);
        instance.add_trip(Trip::new(vec![arc], 0.0, f64::INFINITY));
        instance.add_trip(Trip::new(vec![arc], 0.0, f64::INFINITY));
        instance.populate_conflicting_sets();
        instance
    }

    #[test]
    fn reevaluate_after_destaggering_matches_full_reconstruction() {
        let instance = two_trip_instance();
        let mut sim = Simulator::new(&instance);
        let original = sim.construct(&instance, vec![0.0, 5.0], f64::INFINITY);

        let mut incremental = Incremental::new(&instance);
        let mut moved = original.clone();
        moved.shift_start_time(TripId::from(1usize), -4.0);
        let result = incremental.reevaluate(&instance, &original, moved, &[TripId::from(1usize)], f64::INFINITY);

        let reconstructed = sim.construct(&instance, result.start_times().to_vec(), f64::INFINITY);
        assert_abs_diff_eq!(result.total_delay(), reconstructed.total_delay(), epsilon = 1e-6);
    }

    #[test]
    fn reevaluate_preserves_untouched_trip_schedule() {
        let instance = two_trip_instance();
        let mut sim = Simulator::new(&instance);
        let original = sim.construct(&instance, vec![0.0, 100.0], f64::INFINITY);

        let mut incremental = Incremental::new(&instance);
        let mut moved = original.clone();
        moved.shift_start_time(TripId::from(0usize), 1.0);
        let result = incremental.reevaluate(&instance, &original, moved, &[TripId::from(0usize)], f64::INFINITY);

        assert_eq!(result.arrival(TripId::from(1usize)), original.arrival(TripId::from(1usize)));
    }
}
