use crate::delay::DelayShape;
use crate::instance::{Instance, Trip};
use crate::types::Parameters;
use crate::Engine;

#[test]
fn a_deadline_narrower_than_free_flow_is_infeasible() {
    let mut instance = Instance::new(DelayShape::new([]), Parameters::default());
    let arc = instance.add_arc(10.0, 4);
    instance.add_trip(Trip::with_windows(
        vec![arc],
        0.0,
        5.0,
        vec![0.0, 0.0],
        vec![f64::INFINITY, 5.0],
    ));
    instance.populate_conflicting_sets();

    let mut engine = Engine::new(&instance);
    let solution = engine.construct(vec![0.0]);
    assert!(solution.is_infeasible());
}

#[test]
fn try_run_reports_infeasible_without_erroring() {
    let mut instance = Instance::new(DelayShape::new([]), Parameters::default());
    let arc = instance.add_arc(10.0, 4);
    instance.add_trip(Trip::with_windows(
        vec![arc],
        0.0,
        5.0,
        vec![0.0, 0.0],
        vec![f64::INFINITY, 5.0],
    ));
    instance.populate_conflicting_sets();

    let mut engine = Engine::new(&instance);
    let solution = engine.try_run(vec![0.0]).expect("infeasibility is not a fatal error");
    assert!(solution.is_infeasible());
}

#[test]
fn a_deadline_breach_on_the_first_arc_still_schedules_the_rest_of_the_route() {
    let mut instance = Instance::new(DelayShape::new([]), Parameters::default());
    let arc1 = instance.add_arc(10.0, 4);
    let arc2 = instance.add_arc(10.0, 4);
    let trip = instance.add_trip(Trip::with_windows(
        vec![arc1, arc2],
        0.0,
        1.0,
        vec![0.0, 0.0, 0.0],
        vec![f64::INFINITY, f64::INFINITY, f64::INFINITY],
    ));
    instance.populate_conflicting_sets();

    let mut engine = Engine::new(&instance);
    let solution = engine.construct(vec![0.0]);

    assert!(solution.is_infeasible());
    assert!(
        solution.departure(trip, 1) > 0.0,
        "the second arc's departure must still be scheduled after the deadline is breached on the first"
    );
    assert!(
        solution.departure(trip, 2) > 0.0,
        "the final arrival must still be scheduled after the deadline is breached on the first arc"
    );
}
