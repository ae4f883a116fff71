//! Immutable read model: routes, arc travel times, capacities, time windows,
//! conflicting sets.

use crate::delay::DelayShape;
use crate::types::{ArcId, Parameters, Position, TripId};

/// A trip: an immutable ordered route plus release/deadline/window bounds.
///
/// `earliest`/`latest` are per-position bounds on the *departure* time from
/// that position; they have one more entry than the route (the last entry
/// bounds the arrival at the trip's destination, i.e. the departure from
/// the implicit final position). They are supplied by the caller, derived
/// upstream — this crate never computes them.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Trip {
    route: Vec<ArcId>,
    release: f64,
    deadline: f64,
    due_date: f64,
    earliest: Vec<f64>,
    latest: Vec<f64>,
}

impl Trip {
    /// Builds a trip with infinite (unconstrained) windows; use
    /// [`Trip::with_windows`] to supply earliest/latest bounds explicitly.
    pub fn new(route: Vec<ArcId>, release: f64, deadline: f64) -> Self {
        let n = route.len() + 1;
        Self {
            route,
            release,
            deadline,
            due_date: deadline,
            earliest: vec![0.0; n],
            latest: vec![f64::INFINITY; n],
        }
    }

    /// Builds a trip with explicit per-position earliest/latest departure bounds.
    ///
    /// `earliest`/`latest` must have `route.len() + 1` entries.
    pub fn with_windows(
        route: Vec<ArcId>,
        release: f64,
        deadline: f64,
        earliest: Vec<f64>,
        latest: Vec<f64>,
    ) -> Self {
        assert_eq!(earliest.len(), route.len() + 1);
        assert_eq!(latest.len(), route.len() + 1);
        Self {
            route,
            release,
            deadline,
            due_date: deadline,
            earliest,
            latest,
        }
    }

    /// Sets a soft due date distinct from the hard deadline (the field
    /// `cpp_module/include/instance.h` calls `dueDates`); the core never
    /// consults it, it is carried purely as instance data.
    pub fn with_due_date(mut self, due_date: f64) -> Self {
        self.due_date = due_date;
        self
    }

    /// The free-flow (nominal) travel time of this trip, given arc travel times.
    fn free_flow(&self, instance: &Instance) -> f64 {
        self.route.iter().map(|&a| instance.travel_time(a)).sum()
    }
}

/// A non-dummy arc's static properties.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
struct ArcData {
    travel_time: f64,
    capacity: u32,
}

/// Immutable read model consumed by every component.
///
/// Shared (read-only) for the lifetime of a search.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Instance {
    arcs: Vec<ArcData>,
    trips: Vec<Trip>,
    conflicting_sets: Vec<Vec<TripId>>,
    delay_shape: DelayShape,
    parameters: Parameters,
    lb_travel_time: f64,
}

impl Instance {
    /// Creates an empty instance with the given delay shape and parameters.
    /// Arc `0` (the dummy sentinel) is implicitly present.
    pub fn new(delay_shape: DelayShape, parameters: Parameters) -> Self {
        Self {
            arcs: vec![ArcData {
                travel_time: 0.0,
                capacity: 0,
            }],
            trips: Vec::new(),
            conflicting_sets: vec![Vec::new()],
            delay_shape,
            parameters,
            lb_travel_time: 0.0,
        }
    }

    /// Adds a non-dummy arc with the given nominal travel time and capacity,
    /// returning its id.
    pub fn add_arc(&mut self, travel_time: f64, capacity: u32) -> ArcId {
        assert!(travel_time > 0.0, "arc travel time must be positive");
        assert!(capacity > 0, "arc capacity must be positive");
        self.arcs.push(ArcData {
            travel_time,
            capacity,
        });
        self.conflicting_sets.push(Vec::new());
        ArcId::from(self.arcs.len() - 1)
    }

    /// Adds a trip, returning its id. The trip's route must end with
    /// [`ArcId::DUMMY`] or have it appended automatically if absent.
    pub fn add_trip(&mut self, mut trip: Trip) -> TripId {
        if trip.route.last() != Some(&ArcId::DUMMY) {
            trip.route.push(ArcId::DUMMY);
            trip.earliest.push(0.0);
            trip.latest.push(f64::INFINITY);
        }
        self.lb_travel_time += trip.free_flow(self);
        let id = TripId::from(self.trips.len());
        self.trips.push(trip);
        id
    }

    /// Populates every arc's conflicting set by sweeping all trip routes and
    /// sorting by ascending earliest-departure-on-arc. Idempotent; call after
    /// all trips are added.
    ///
    /// This is the only mutation `Instance` performs after construction, and
    /// it is a pure derived index — no caller-visible ambiguity is introduced.
    pub fn populate_conflicting_sets(&mut self) {
        for set in &mut self.conflicting_sets {
            set.clear();
        }
        for (trip_idx, trip) in self.trips.iter().enumerate() {
            let trip_id = TripId::from(trip_idx);
            for &arc in &trip.route {
                if !arc.is_dummy() {
                    self.conflicting_sets[arc.index()].push(trip_id);
                }
            }
        }
        for arc_idx in 0..self.conflicting_sets.len() {
            let arc = ArcId::from(arc_idx);
            let mut set = std::mem::take(&mut self.conflicting_sets[arc_idx]);
            set.sort_by(|&a, &b| {
                let pa = self.position_of(a, arc).unwrap();
                let pb = self.position_of(b, arc).unwrap();
                self.trips[a.index()].earliest[pa]
                    .partial_cmp(&self.trips[b.index()].earliest[pb])
                    .unwrap()
                    .then(a.0.cmp(&b.0))
            });
            self.conflicting_sets[arc_idx] = set;
        }
    }

    /// Finds the position of `arc` within `trip`'s route, if present.
    pub fn position_of(&self, trip: TripId, arc: ArcId) -> Option<Position> {
        self.trips[trip.index()]
            .route
            .iter()
            .position(|&a| a == arc)
    }

    /// This trip's ordered route.
    pub fn route(&self, trip: TripId) -> &[ArcId] {
        &self.trips[trip.index()].route
    }

    /// The arc at `position` in `trip`'s route.
    pub fn route_at(&self, trip: TripId, position: Position) -> ArcId {
        self.trips[trip.index()].route[position]
    }

    /// Number of positions (arcs, including the trailing dummy) in `trip`'s route.
    pub fn route_len(&self, trip: TripId) -> usize {
        self.trips[trip.index()].route.len()
    }

    /// Number of trips in the instance.
    pub fn num_trips(&self) -> usize {
        self.trips.len()
    }

    /// Number of arcs, including the dummy.
    pub fn num_arcs(&self) -> usize {
        self.arcs.len()
    }

    /// Nominal travel time of `arc`.
    pub fn travel_time(&self, arc: ArcId) -> f64 {
        self.arcs[arc.index()].travel_time
    }

    /// Capacity of `arc`.
    pub fn capacity(&self, arc: ArcId) -> u32 {
        self.arcs[arc.index()].capacity
    }

    /// Earliest permitted departure from `position` in `trip`'s route.
    pub fn earliest(&self, trip: TripId, position: Position) -> f64 {
        self.trips[trip.index()].earliest[position]
    }

    /// Latest permitted departure from `position` in `trip`'s route.
    pub fn latest(&self, trip: TripId, position: Position) -> f64 {
        self.trips[trip.index()].latest[position]
    }

    /// The trips sharing `arc`, in ascending earliest-departure-on-arc order.
    pub fn conflicting_set(&self, arc: ArcId) -> &[TripId] {
        &self.conflicting_sets[arc.index()]
    }

    /// Release time of `trip`.
    pub fn release(&self, trip: TripId) -> f64 {
        self.trips[trip.index()].release
    }

    /// Hard deadline of `trip`.
    pub fn deadline(&self, trip: TripId) -> f64 {
        self.trips[trip.index()].deadline
    }

    /// Soft due date of `trip` (supplemented field; unused by the core algorithms).
    pub fn due_date(&self, trip: TripId) -> f64 {
        self.trips[trip.index()].due_date
    }

    /// Free-flow (nominal) travel time of `trip`.
    pub fn free_flow(&self, trip: TripId) -> f64 {
        self.trips[trip.index()].free_flow(self)
    }

    /// Sum of free-flow travel times over all trips, as supplied/accumulated
    /// at construction time; used by `Solution::total_travel_time`.
    pub fn lb_travel_time(&self) -> f64 {
        self.lb_travel_time
    }

    /// The shared delay shape.
    pub fn delay_shape(&self) -> &DelayShape {
        &self.delay_shape
    }

    /// Delay experienced on `arc` at flow `flow`.
    pub fn delay(&self, arc: ArcId, flow: f64) -> f64 {
        self.delay_shape.evaluate(self, arc, flow)
    }

    /// The tunable parameters this instance was built with.
    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Serializes this instance to a JSON string.
    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> Result<String, crate::error::ScheduleError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses an instance previously written by [`Instance::to_json`].
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self, crate::error::ScheduleError> {
        Ok(serde_json::from_str(json)?)
    }
}
