//! Round-tripping `Instance`/`Solution` through JSON (the `serde` feature).
//!
//! Every bound here is finite: `serde_json` writes a non-finite `f64` as
//! `null`, which a plain (non-`Option`) `f64` field can't read back, so an
//! instance built with an unbounded deadline or window can't round-trip.

use pretty_assertions::assert_eq;

use crate::delay::DelayShape;
use crate::instance::Trip;
use crate::types::Parameters;
use crate::Engine;
use crate::Instance;
use crate::ScheduleError;
use crate::Solution;

fn finite_instance() -> Instance {
    let mut instance = Instance::new(DelayShape::new([(0.5, 1.0)]), Parameters::default());
    let arc = instance.add_arc(6.0, 1);
    instance.add_trip(Trip::with_windows(vec![arc], 0.0, 50.0, vec![0.0, 0.0], vec![50.0, 50.0]));
    instance.add_trip(Trip::with_windows(vec![arc], 0.0, 50.0, vec![0.0, 0.0], vec![50.0, 50.0]));
    instance.populate_conflicting_sets();
    instance
}

#[test]
fn instance_survives_a_json_round_trip() {
    let instance = finite_instance();
    let json = instance.to_json().unwrap();
    let restored = Instance::from_json(&json).unwrap();
    assert_eq!(restored, instance);
}

#[test]
fn solution_survives_a_json_round_trip() {
    let instance = finite_instance();
    let mut engine = Engine::new(&instance);
    let solution = engine.construct(vec![0.0, 0.0]);

    let json = solution.to_json().unwrap();
    let restored = Solution::from_json(&json).unwrap();
    assert_eq!(restored, solution);
}

#[test]
fn malformed_json_reports_a_schedule_error() {
    let err = Instance::from_json("not json").unwrap_err();
    assert!(matches!(err, ScheduleError::JsonError(_)));
}
