//! Event-driven construction of a schedule from start times.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use log::{debug, trace};
use ordered_float::NotNan;

use crate::event::{Departure, EventKind};
use crate::instance::Instance;
use crate::solution::Solution;
use crate::types::TripId;

/// Scratch state for the forward simulator, reserved once and cleared (not
/// freed) between invocations.
#[derive(Debug, Default)]
pub(crate) struct Simulator {
    queue: BinaryHeap<Departure>,
    arc_arrivals: Vec<BinaryHeap<Reverse<NotNan<f64>>>>,
}

impl Simulator {
    pub(crate) fn new(instance: &Instance) -> Self {
        let mut sim = Self {
            queue: BinaryHeap::with_capacity(instance.num_trips()),
            arc_arrivals: Vec::new(),
        };
        sim.resize_for(instance);
        sim
    }

    fn resize_for(&mut self, instance: &Instance) {
        if self.arc_arrivals.len() != instance.num_arcs() {
            self.arc_arrivals = (0..instance.num_arcs()).map(|_| BinaryHeap::new()).collect();
        } else {
            for q in &mut self.arc_arrivals {
                q.clear();
            }
        }
        self.queue.clear();
    }

    /// Computes the congested schedule from `start_times` from scratch
    /// `best_total_delay` is the driver's early-exit benchmark (`+inf` for a
    /// bare `construct` call outside a search).
    pub(crate) fn construct(
        &mut self,
        instance: &Instance,
        start_times: Vec<f64>,
        best_total_delay: f64,
    ) -> Solution {
        self.resize_for(instance);
        let mut solution = Solution::new(instance, start_times);

        for t in 0..instance.num_trips() {
            let trip = TripId::from(t);
            let time = solution.start_time(trip);
            self.queue.push(Departure {
                time: NotNan::new(time).expect("start time must not be NaN"),
                arc: instance.route_at(trip, 0),
                trip,
                position: 0,
                kind: EventKind::Travel,
                reinsertion: 0,
            });
        }

        while let Some(departure) = self.queue.pop() {
            let Departure {
                time,
                arc,
                trip,
                position,
                ..
            } = departure;
            solution.set_departure(trip, position, time.into_inner());

            if arc.is_dummy() {
                // the trip has arrived; nothing further to schedule
                continue;
            }

            let flow = self.flow_on_arc(arc, time.into_inner());
            let delay = instance.delay(arc, flow);
            let arrival = time.into_inner() + instance.travel_time(arc) + delay;
            solution.add_total_delay(delay);
            self.arc_arrivals[arc.index()].push(Reverse(NotNan::new(arrival).unwrap()));
            trace!(
                "construct: trip={trip} arc={arc} pos={position} depart={} flow={flow} delay={delay} arrive={arrival}",
                time.into_inner()
            );

            if position + 1 < instance.route_len(trip) {
                self.queue.push(Departure {
                    time: NotNan::new(arrival).unwrap(),
                    arc: instance.route_at(trip, position + 1),
                    trip,
                    position: position + 1,
                    kind: EventKind::Travel,
                    reinsertion: 0,
                });
            }

            if arrival > instance.deadline(trip) + instance.parameters().numeric_tolerance
                || solution.total_delay() >= best_total_delay
            {
                solution.mark_infeasible();
                solution.set_non_improving(solution.total_delay() >= best_total_delay);
                debug!(
                    "construct: trip={trip} aborted (deadline or non-improving), total_delay={}",
                    solution.total_delay()
                );
                continue;
            }
        }

        solution
    }

    /// `flow = 1 + |{arrivals on arc with time ≤ current time}|`, draining
    /// the arc-local arrival queue as it goes.
    fn flow_on_arc(&mut self, arc: crate::types::ArcId, current_time: f64) -> f64 {
        let q = &mut self.arc_arrivals[arc.index()];
        while matches!(q.peek(), Some(Reverse(t)) if t.into_inner() <= current_time) {
            q.pop();
        }
        1.0 + q.len() as f64
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::delay::DelayShape;
    use crate::instance::Trip;
    use crate::types::Parameters;

    #[test]
    fn empty_network_yields_empty_schedule() {
        let instance = Instance::new(DelayShape::new([]), Parameters::default());
        let mut sim = Simulator::new(&instance);
        let solution = sim.construct(&instance, vec![], f64::INFINITY);
        assert_eq!(solution.total_delay(), 0.0);
        assert!(!solution.is_infeasible());
    }

    #[test]
    fn single_trip_single_dummy_arc() {
        let mut instance = Instance::new(DelayShape::new([]), Parameters::default());
        instance.add_trip(Trip::new(vec![], 0.0, f64::INFINITY));
        instance.populate_conflicting_sets();
        let mut sim = Simulator::new(&instance);
        let solution = sim.construct(&instance, vec![0.0], f64::INFINITY);
        assert_eq!(solution.departure(TripId::from(0usize), 0), 0.0);
        assert_eq!(solution.total_delay(), 0.0);
        assert!(!solution.is_infeasible());
    }

    #[test]
    fn two_non_interacting_trips() {
        let mut instance = Instance::new(DelayShape::new([(0.5, 1.0)]), Parameters::default());
        let a1 = instance.add_arc(5.0, 1);
        let a2 = instance.add_arc(7.5, 1);
        instance.add_trip(Trip::new(vec![a1], 0.0, f64::INFINITY));
        instance.add_trip(Trip::new(vec![a2], 1.0, f64::INFINITY));
        instance.populate_conflicting_sets();
        let mut sim = Simulator::new(&instance);
        let solution = sim.construct(&instance, vec![0.0, 1.0], f64::INFINITY);
        assert_eq!(solution.total_delay(), 0.0);
        assert_eq!(solution.arrival(TripId::from(0usize)), 5.0);
        assert_eq!(solution.arrival(TripId::from(1usize)), 8.5);
    }

    #[test]
    fn two_trips_conflicting_produce_ties_flag_elsewhere_but_delay_here() {
        let mut instance = Instance::new(DelayShape::new([(0.5, 1.0)]), Parameters::default());
        let arc = instance.add_arc(6.0, 1);
        instance.add_trip(Trip::new(vec![arc], 0.0, f64::INFINITY));
        instance.add_trip(Trip::new(vec![arc], 0.0, f64::INFINITY));
        instance.populate_conflicting_sets();
        let mut sim = Simulator::new(&instance);
        let solution = sim.construct(&instance, vec![0.0, 0.0], f64::INFINITY);
        // one trip departs at flow=1 (no delay), the other sees flow=2 and is delayed.
        assert!(solution.total_delay() > 0.0);
    }
}
