use crate::tie::solution_has_ties;
use crate::Engine;

use super::shared_arc_instance;

#[test]
fn simultaneous_departures_are_detected_as_tied() {
    let (instance, _arc) = shared_arc_instance(2, 2, 5.0);
    let mut engine = Engine::new(&instance);
    let solution = engine.construct(vec![0.0, 0.0]);
    assert!(solution_has_ties(&instance, &solution));
}

#[test]
fn try_run_leaves_no_open_tie_between_the_two_trips_it_started_with() {
    let (instance, _arc) = shared_arc_instance(2, 2, 5.0);
    let mut engine = Engine::new(&instance);
    let solution = engine.try_run(vec![0.0, 0.0]).unwrap();
    assert!(!solution.is_infeasible());
    assert!(!solution_has_ties(&instance, &solution));
}
