//! End-to-end scenarios exercised through the public [`crate::Engine`] API.

mod test_forward_construction;
mod test_infeasible;
#[cfg(feature = "serde")]
mod test_json;
mod test_local_search;
mod test_ties;

use crate::delay::DelayShape;
use crate::instance::{Instance, Trip};
use crate::types::{ArcId, Parameters};

/// Builds an instance with one arc shared by `n` trips, all released at
/// `0.0` with a generous deadline, used by several scenarios below.
fn shared_arc_instance(n: usize, capacity: u32, travel_time: f64) -> (Instance, ArcId) {
    let mut instance = Instance::new(DelayShape::new([(0.5, 1.0)]), Parameters::default());
    let arc = instance.add_arc(travel_time, capacity);
    for _ in 0..n {
        instance.add_trip(Trip::new(vec![arc], 0.0, f64::INFINITY));
    }
    instance.populate_conflicting_sets();
    (instance, arc)
}
