use pretty_assertions::assert_eq;

use crate::delay::DelayShape;
use crate::instance::{Instance, Trip};
use crate::types::Parameters;
use crate::Engine;

use super::shared_arc_instance;

#[test]
fn staggering_two_simultaneous_trips_never_increases_delay() {
    let (instance, _arc) = shared_arc_instance(2, 1, 6.0);
    let mut engine = Engine::new(&instance);
    let initial = engine.construct(vec![0.0, 0.0]);

    let solution = engine.try_run(vec![0.0, 0.0]).unwrap();
    assert!(!solution.is_infeasible());
    assert!(solution.total_delay() <= initial.total_delay() + 1e-6);
}

#[test]
fn search_can_fully_separate_two_trips_given_enough_slack() {
    let mut instance = Instance::new(DelayShape::new([(0.5, 1.0)]), Parameters::default());
    let arc = instance.add_arc(6.0, 1);
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

    let mut engine = Engine::new(&instance);
    let solution = engine.try_run(vec![0.0, 0.0]).unwrap();
    assert!(!solution.is_infeasible());
    assert_eq!(solution.total_delay(), 0.0);
}

#[test]
fn a_four_way_conflict_converges_to_a_feasible_schedule() {
    let (instance, _arc) = shared_arc_instance(4, 1, 6.0);
    let mut engine = Engine::new(&instance);
    let solution = engine.try_run(vec![0.0, 0.0, 0.0, 0.0]).unwrap();
    assert!(!solution.is_infeasible());
}
