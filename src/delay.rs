//! Piecewise-linear arc delay as a function of arc flow.

use crate::instance::Instance;
use crate::types::ArcId;

/// One piece of the shared piecewise-linear delay shape: a slope and the
/// flow threshold (as a fraction of arc capacity) at which it kicks in.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DelayPiece {
    /// Slope of this piece.
    pub slope: f64,
    /// Flow threshold, as a fraction of arc capacity, at which this piece begins.
    pub threshold: f64,
}

/// The delay shape shared by every non-dummy arc: an ordered list of
/// `(slope, threshold)` pieces.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DelayShape(pub Vec<DelayPiece>);

impl DelayShape {
    /// Builds a shape from parallel slope/threshold lists, as the instance
    /// ingestion layer would hand them in (grounded on
    /// `cpp_module/include/instance.h`'s `list_of_slopes`/`list_of_thresholds`).
    pub fn new(pieces: impl IntoIterator<Item = (f64, f64)>) -> Self {
        Self(
            pieces
                .into_iter()
                .map(|(slope, threshold)| DelayPiece { slope, threshold })
                .collect(),
        )
    }

    /// Evaluates the delay for `flow` units on `arc`.
    ///
    /// `delay(v, a) = max over pieces i of H_i + slope_i * T(a) / C(a) * max(0, v - threshold_i * C(a))`
    /// where `H_i` is the cumulative height at the start of piece `i`. Arc 0 (the
    /// dummy sentinel) always returns zero.
    pub fn evaluate(&self, instance: &Instance, arc: ArcId, flow: f64) -> f64 {
        if arc.is_dummy() {
            return 0.0;
        }
        let travel_time = instance.travel_time(arc);
        let capacity = instance.capacity(arc) as f64;

        let mut height_prev_piece = 0.0_f64;
        let mut best = 0.0_f64;

        for (i, piece) in self.0.iter().enumerate() {
            let threshold_capacity = piece.threshold * capacity;
            let slope = travel_time * piece.slope / capacity;

            if flow > threshold_capacity {
                let delay_at_piece = height_prev_piece + slope * (flow - threshold_capacity);
                if delay_at_piece > best {
                    best = delay_at_piece;
                }
            }

            if let Some(next) = self.0.get(i + 1) {
                let next_threshold_capacity = next.threshold * capacity;
                height_prev_piece += slope * (next_threshold_capacity - threshold_capacity);
            }
        }

        best
    }
}
