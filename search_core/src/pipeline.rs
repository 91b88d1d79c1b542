//! End-to-end planning: segment → compress → plan → decompress.
//!
//! # Usage
//!
//! ```ignore
//! use search_core::{GeoPoint, PlanRequest, PlannerConfig, SearchPlanner};
//!
//! let planner = SearchPlanner::new(PlannerConfig::default());
//! let plan = planner.plan(&PlanRequest::new(boundary, start))?;
//!
//! for waypoint in &plan.waypoints {
//!     println!("{:.7}, {:.7} @ {} m", waypoint.latitude, waypoint.longitude, waypoint.altitude);
//! }
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::cell_map::CellMap;
use crate::compressor::{CompressionMap, Compressor};
use crate::config::PlannerConfig;
use crate::decompressor::{Decompressor, Waypoint};
use crate::error::PlanResult;
use crate::geo_helpers::GeoPoint;
use crate::planner::{PathPlanner, PlanStatus};
use crate::segmenter::{ProbabilitySeed, Segmenter};

/// Inputs for one planning run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRequest {
    /// Search area boundary, ≥3 vertices
    pub boundary: Vec<GeoPoint>,

    /// Prior sightings or other hints
    #[serde(default)]
    pub seeds: Vec<ProbabilitySeed>,

    /// Vehicle position when the search begins
    pub start: GeoPoint,
}

impl PlanRequest {
    pub fn new(boundary: Vec<GeoPoint>, start: GeoPoint) -> Self {
        Self {
            boundary,
            seeds: Vec::new(),
            start,
        }
    }

    pub fn with_seeds(mut self, seeds: Vec<ProbabilitySeed>) -> Self {
        self.seeds = seeds;
        self
    }
}

/// Summary numbers for a plan.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PlanStats {
    pub fine_cells: usize,
    pub coarse_cells: usize,
    /// Coarse cells above the probability threshold
    pub qualifying_cells: usize,
    pub coarse_path_len: usize,
    pub waypoint_count: usize,
    /// Coarse-center route length, the quantity the budget limits
    pub coarse_distance_m: f64,
    /// Fine route length, start leg included
    pub flight_distance_m: f64,
    /// Share of total fine probability the route covers
    pub probability_covered: f64,
}

/// Result of one planning run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchPlan {
    pub status: PlanStatus,
    pub waypoints: Vec<Waypoint>,
    /// Coarse slot indices in flight order
    pub coarse_path: Vec<usize>,
    /// Fine slot indices in flight order, one per waypoint
    pub fine_path: Vec<usize>,
    /// Fine probability snapshot with planned cells marked visited
    pub probability_map: CellMap,
    pub compression: CompressionMap,
    pub stats: PlanStats,
}

impl SearchPlan {
    pub fn is_complete(&self) -> bool {
        self.status == PlanStatus::Complete
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Qualifying coarse cells left out by the budget.
    pub fn unvisited(&self) -> &[usize] {
        match &self.status {
            PlanStatus::BudgetExhausted { unvisited } => unvisited,
            _ => &[],
        }
    }
}

/// Receives finished waypoint lists (the flight-control collaborator).
pub trait FlightSink {
    fn fly(&mut self, waypoints: &[Waypoint]) -> PlanResult<()>;
}

/// Runs the full planning pipeline for a configuration.
#[derive(Debug, Clone)]
pub struct SearchPlanner {
    config: PlannerConfig,
}

impl SearchPlanner {
    pub fn new(config: PlannerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Plans a coverage route. Parameter and geometry errors are raised
    /// before any grid is built.
    pub fn plan(&self, request: &PlanRequest) -> PlanResult<SearchPlan> {
        let config = &self.config;
        config.validate()?;

        let segmenter = Segmenter::new(config.cell_size_m)
            .with_alignment(config.alignment)
            .with_prior(config.prior);
        let mut fine = segmenter.segment(&request.boundary, &request.seeds)?;

        let compressor = Compressor::new(config.compression_factor)?.with_aggregation(config.aggregation.aggregate_fn());
        let (coarse, compression) = compressor.compress(&fine)?;

        let path = PathPlanner::new(config.min_probability)
            .with_budget(config.budget)
            .plan(&coarse, request.start)?;
        debug!(status = path.status.name(), cells = path.len(), "coarse path planned");

        let route = Decompressor::new(config.altitude_m).expand(&path.cells, &compression, &fine, request.start)?;
        fine.mark_visited(&route.fine_cells);

        let total = fine.total_probability();
        let covered: f64 = route
            .fine_cells
            .iter()
            .filter_map(|&i| fine.cell(i))
            .map(|c| c.probability())
            .sum();

        let stats = PlanStats {
            fine_cells: fine.len(),
            coarse_cells: coarse.len(),
            qualifying_cells: path.qualifying,
            coarse_path_len: path.len(),
            waypoint_count: route.waypoints.len(),
            coarse_distance_m: path.travel_distance_m,
            flight_distance_m: route.travel_distance_m,
            probability_covered: if total > 0.0 { covered / total } else { 0.0 },
        };

        info!(
            status = path.status.name(),
            waypoints = stats.waypoint_count,
            flight_distance_m = stats.flight_distance_m,
            "search plan ready"
        );

        Ok(SearchPlan {
            status: path.status,
            waypoints: route.waypoints,
            coarse_path: path.cells,
            fine_path: route.fine_cells,
            probability_map: fine,
            compression,
            stats,
        })
    }

    /// Plans and hands the waypoints to `sink`. An empty plan is returned
    /// without calling the sink.
    pub fn execute<S: FlightSink>(&self, request: &PlanRequest, sink: &mut S) -> PlanResult<SearchPlan> {
        let plan = self.plan(request)?;
        if !plan.is_empty() {
            sink.fly(&plan.waypoints)?;
        }
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PathBudget;
    use crate::error::PlanError;
    use crate::geo_helpers::LocalFrame;
    use geo::coord;

    const ORIGIN: GeoPoint = GeoPoint {
        latitude: 38.3144,
        longitude: -76.5452,
    };

    fn local(x: f64, y: f64) -> GeoPoint {
        LocalFrame::new(ORIGIN).to_geographic(coord! { x: x, y: y })
    }

    fn square(side: f64) -> Vec<GeoPoint> {
        vec![local(0.0, 0.0), local(side, 0.0), local(side, side), local(0.0, side)]
    }

    fn config(cell_size_m: f64, k: usize) -> PlannerConfig {
        PlannerConfig {
            cell_size_m,
            compression_factor: k,
            ..PlannerConfig::default()
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        flights: Vec<Vec<Waypoint>>,
    }

    impl FlightSink for RecordingSink {
        fn fly(&mut self, waypoints: &[Waypoint]) -> PlanResult<()> {
            self.flights.push(waypoints.to_vec());
            Ok(())
        }
    }

    struct RejectingSink;

    impl FlightSink for RejectingSink {
        fn fly(&mut self, _: &[Waypoint]) -> PlanResult<()> {
            Err(PlanError::FlightRejected("link down".to_string()))
        }
    }

    #[test]
    fn test_three_by_three_single_coarse_cell() {
        let planner = SearchPlanner::new(config(10.0, 3));
        let plan = planner.plan(&PlanRequest::new(square(30.0), local(1.0, 1.0))).unwrap();

        assert_eq!(plan.coarse_path, vec![0]);
        assert_eq!(plan.fine_path, vec![0, 1, 2, 5, 4, 3, 6, 7, 8]);
        assert_eq!(plan.waypoints.len(), 9);
        assert!(plan.is_complete());
        assert_eq!(plan.probability_map.visited_count(), 9);
        assert!((plan.stats.probability_covered - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_polygon_fails_fast() {
        let line = vec![local(0.0, 0.0), local(50.0, 0.0), local(100.0, 0.0)];
        let planner = SearchPlanner::new(config(10.0, 2));
        assert!(matches!(
            planner.plan(&PlanRequest::new(line, local(0.0, 0.0))),
            Err(PlanError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn test_threshold_above_all_is_empty_plan() {
        let mut cfg = config(10.0, 2);
        cfg.min_probability = 1e6;
        let plan = SearchPlanner::new(cfg)
            .plan(&PlanRequest::new(square(40.0), local(5.0, 5.0)))
            .unwrap();

        assert_eq!(plan.status, PlanStatus::Empty);
        assert!(plan.is_empty());
        assert!(plan.fine_path.is_empty());
        assert_eq!(plan.probability_map.visited_count(), 0);
    }

    #[test]
    fn test_budget_exhaustion_is_partial_success() {
        let mut cfg = config(10.0, 2);
        cfg.budget = PathBudget::unconstrained().with_max_cells(1);
        let plan = SearchPlanner::new(cfg)
            .plan(&PlanRequest::new(square(40.0), local(5.0, 5.0)))
            .unwrap();

        assert_eq!(plan.coarse_path.len(), 1);
        assert_eq!(plan.unvisited().len(), 3);
        assert_eq!(plan.waypoints.len(), 4);
    }

    #[test]
    fn test_start_outside_area() {
        let planner = SearchPlanner::new(config(10.0, 2));
        let err = planner
            .plan(&PlanRequest::new(square(40.0), local(500.0, 500.0)))
            .unwrap_err();
        assert!(matches!(err, PlanError::NoStartPosition { .. }));
    }

    #[test]
    fn test_start_at_far_corner_vertex() {
        for side in [30.0, 40.0, 50.0, 90.0, 100.0, 120.0, 300.0] {
            let boundary = square(side);
            let start = boundary[2];
            let plan = SearchPlanner::new(config(10.0, 1))
                .plan(&PlanRequest::new(boundary, start))
                .unwrap_or_else(|e| panic!("side {}: {}", side, e));
            assert!(plan.is_complete());
        }
    }

    #[test]
    fn test_seed_pulls_route_toward_sighting() {
        let seed = ProbabilitySeed::new(local(75.0, 75.0), 5.0).with_sigma(10.0);
        let request = PlanRequest::new(square(80.0), local(1.0, 1.0)).with_seeds(vec![seed]);
        let plan = SearchPlanner::new(config(10.0, 2)).plan(&request).unwrap();

        // First coarse block visited is the one holding the seed
        let (rows, cols) = plan.compression.coarse_dims();
        assert_eq!(plan.coarse_path[0], rows * cols - 1);
    }

    #[test]
    fn test_execute_sends_waypoints() {
        let planner = SearchPlanner::new(config(10.0, 2));
        let mut sink = RecordingSink::default();
        let plan = planner
            .execute(&PlanRequest::new(square(40.0), local(5.0, 5.0)), &mut sink)
            .unwrap();

        assert_eq!(sink.flights.len(), 1);
        assert_eq!(sink.flights[0], plan.waypoints);
    }

    #[test]
    fn test_execute_skips_sink_for_empty_plan() {
        let mut cfg = config(10.0, 2);
        cfg.min_probability = 1e6;
        let mut sink = RejectingSink;
        let plan = SearchPlanner::new(cfg)
            .execute(&PlanRequest::new(square(40.0), local(5.0, 5.0)), &mut sink)
            .unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_execute_propagates_sink_failure() {
        let mut sink = RejectingSink;
        let err = SearchPlanner::new(config(10.0, 2))
            .execute(&PlanRequest::new(square(40.0), local(5.0, 5.0)), &mut sink)
            .unwrap_err();
        assert!(matches!(err, PlanError::FlightRejected(_)));
    }

    #[test]
    fn test_invalid_config_rejected_before_segmenting() {
        let planner = SearchPlanner::new(config(10.0, 0));
        assert_eq!(
            planner.plan(&PlanRequest::new(vec![], local(0.0, 0.0))).unwrap_err(),
            PlanError::InvalidCompressionFactor(0)
        );
    }
}
