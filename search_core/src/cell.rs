//! A single grid square of the search area.

use geo::{Coord, Rect};
use serde::{Deserialize, Serialize};

/// One cell of a [`crate::CellMap`].
///
/// Bounds are in the owning map's local frame and never change once the
/// cell exists. Probability is a relative weight, not a normalized
/// distribution; it is clamped to be non-negative. `visited` only ever goes
/// from false to true.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    bounds: Rect<f64>,
    probability: f64,
    visited: bool,
}

impl Cell {
    /// Creates an unvisited cell. Negative or NaN probabilities become 0.
    pub fn new(bounds: Rect<f64>, probability: f64) -> Self {
        Self {
            bounds,
            probability: sanitize(probability),
            visited: false,
        }
    }

    pub fn bounds(&self) -> Rect<f64> {
        self.bounds
    }

    /// Centroid in local meters.
    pub fn center(&self) -> Coord<f64> {
        self.bounds.center()
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }

    pub fn is_visited(&self) -> bool {
        self.visited
    }

    pub fn mark_visited(&mut self) {
        self.visited = true;
    }

    /// Copy of this cell carrying a different probability.
    pub fn with_probability(&self, probability: f64) -> Self {
        Self {
            bounds: self.bounds,
            probability: sanitize(probability),
            visited: self.visited,
        }
    }
}

fn sanitize(probability: f64) -> f64 {
    if probability.is_finite() && probability > 0.0 {
        probability
    } else if probability == f64::INFINITY {
        f64::MAX
    } else {
        0.0
    }
}
