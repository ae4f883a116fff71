use pretty_assertions::assert_eq;

use crate::Engine;

use super::shared_arc_instance;

#[test]
fn single_trip_feels_no_delay() {
    let (instance, _arc) = shared_arc_instance(1, 4, 6.0);
    let mut engine = Engine::new(&instance);
    let solution = engine.construct(vec![0.0]);
    assert_eq!(solution.total_delay(), 0.0);
    assert!(!solution.is_infeasible());
}

#[test]
fn trips_below_capacity_never_delay_each_other() {
    let (instance, _arc) = shared_arc_instance(3, 10, 5.0);
    let mut engine = Engine::new(&instance);
    let solution = engine.construct(vec![0.0, 0.0, 0.0]);
    assert_eq!(solution.total_delay(), 0.0);
}

#[test]
fn trips_over_capacity_accumulate_delay() {
    let (instance, _arc) = shared_arc_instance(3, 1, 5.0);
    let mut engine = Engine::new(&instance);
    let solution = engine.construct(vec![0.0, 0.0, 0.0]);
    assert!(solution.total_delay() > 0.0);
}
