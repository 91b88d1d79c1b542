//! Greedy coverage planning over the coarse grid.
//!
//! From the current position the planner repeatedly flies to the unvisited
//! qualifying cell with the best `probability / distance` ratio, so likely
//! regions are front-loaded while short hops are still preferred among
//! cells of similar value. Ties go to the lower row-major index, which keeps
//! the result fully deterministic.

use geo::Coord;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cell_map::CellMap;
use crate::config::{validate_budget, validate_threshold, PathBudget};
use crate::error::{PlanError, PlanResult};
use crate::geo_helpers::{planar_distance, rect_contains, GeoPoint};

/// Distances below this (meters) count as this for scoring, so a cell under
/// the vehicle is scored finitely
pub const MIN_TRAVEL_M: f64 = 1e-3;

/// How planning ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PlanStatus {
    /// Every qualifying cell is in the path
    Complete,
    /// The budget ran out first; `unvisited` lists the qualifying cells left
    /// over, row-major
    BudgetExhausted { unvisited: Vec<usize> },
    /// No cell exceeds the probability threshold
    Empty,
}

impl PlanStatus {
    pub fn name(&self) -> &'static str {
        match self {
            PlanStatus::Complete => "complete",
            PlanStatus::BudgetExhausted { .. } => "budget_exhausted",
            PlanStatus::Empty => "empty",
        }
    }
}

/// Ordered coarse cells to visit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoveragePath {
    /// Coarse slot indices in flight order, no duplicates
    pub cells: Vec<usize>,
    pub status: PlanStatus,
    /// Start → first cell → ... → last cell, between cell centers (meters)
    pub travel_distance_m: f64,
    /// Cells that exceeded the threshold
    pub qualifying: usize,
}

impl CoveragePath {
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Greedy value-per-distance planner.
#[derive(Debug, Clone, Copy)]
pub struct PathPlanner {
    min_probability: f64,
    budget: PathBudget,
}

impl PathPlanner {
    pub fn new(min_probability: f64) -> Self {
        Self {
            min_probability,
            budget: PathBudget::unconstrained(),
        }
    }

    pub fn with_budget(mut self, budget: PathBudget) -> Self {
        self.budget = budget;
        self
    }

    /// Plans a visiting order over `map` starting from `start`.
    ///
    /// # Errors
    /// * `NoStartPosition` - `start` is outside the grid's bounding box
    /// * `InvalidParameter` - bad threshold or distance budget
    pub fn plan(&self, map: &CellMap, start: GeoPoint) -> PlanResult<CoveragePath> {
        validate_threshold(self.min_probability)?;
        validate_budget(&self.budget)?;

        let mut position = map.frame().to_local(start);
        if !start.is_valid() || !rect_contains(&map.extent(), position) {
            return Err(PlanError::NoStartPosition {
                latitude: start.latitude,
                longitude: start.longitude,
            });
        }

        let candidates: Vec<(usize, Coord<f64>, f64)> = map
            .cells()
            .filter(|(_, cell)| cell.probability() > self.min_probability)
            .map(|(i, cell)| (i, cell.center(), cell.probability()))
            .collect();

        if candidates.is_empty() {
            debug!(min_probability = self.min_probability, "no cell above threshold");
            return Ok(CoveragePath {
                cells: Vec::new(),
                status: PlanStatus::Empty,
                travel_distance_m: 0.0,
                qualifying: 0,
            });
        }

        let mut visited = vec![false; candidates.len()];
        let mut path = Vec::with_capacity(candidates.len());
        let mut travelled = 0.0;

        while path.len() < candidates.len() {
            if self.budget.max_cells.is_some_and(|max| path.len() >= max) {
                break;
            }

            let Some((slot, leg)) = Self::best_next(&candidates, &visited, position) else {
                break;
            };
            if self.budget.max_distance_m.is_some_and(|max| travelled + leg > max) {
                break;
            }

            let (index, center, _) = candidates[slot];
            visited[slot] = true;
            path.push(index);
            travelled += leg;
            position = center;
        }

        let status = if path.len() == candidates.len() {
            PlanStatus::Complete
        } else {
            let unvisited: Vec<usize> = candidates
                .iter()
                .zip(&visited)
                .filter(|(_, seen)| !**seen)
                .map(|((i, _, _), _)| *i)
                .collect();
            warn!(
                planned = path.len(),
                remaining = unvisited.len(),
                travelled_m = travelled,
                "path budget exhausted before full coverage"
            );
            PlanStatus::BudgetExhausted { unvisited }
        };

        Ok(CoveragePath {
            cells: path,
            status,
            travel_distance_m: travelled,
            qualifying: candidates.len(),
        })
    }

    /// Candidate slot with the best ratio, and the leg length to reach it.
    fn best_next(candidates: &[(usize, Coord<f64>, f64)], visited: &[bool], position: Coord<f64>) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64, f64)> = None;
        for (slot, &(_, center, probability)) in candidates.iter().enumerate() {
            if visited[slot] {
                continue;
            }
            let leg = planar_distance(position, center);
            let score = probability / leg.max(MIN_TRAVEL_M);
            // Strict comparison: earlier (lower index) candidates win ties
            if best.map_or(true, |(_, _, s)| score > s) {
                best = Some((slot, leg, score));
            }
        }
        best.map(|(slot, leg, _)| (slot, leg))
    }
}
