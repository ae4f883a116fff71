//! Convenience re-export of the common members.

pub use crate::{
    ArcId, DelayPiece, DelayShape, Engine, Instance, Parameters, Position, ScheduleError,
    SearchStats, Solution, Trip, TripId,
};
