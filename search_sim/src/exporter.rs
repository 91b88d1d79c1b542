//! JSON exporter for planned searches.
//!
//! Writes the waypoint route together with the fine probability grid so the
//! plan can be plotted or replayed offline.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;

use search_core::{GeoPoint, PlanStats, PlannerConfig, SearchPlan, Waypoint};

/// One fine cell of the exported probability grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellRecord {
    pub index: usize,
    pub row: usize,
    pub col: usize,
    pub latitude: f64,
    pub longitude: f64,
    pub probability: f64,
    pub visited: bool,
}

/// Complete plan export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanExport {
    /// Area name
    pub area: String,

    /// Configuration the plan was built with
    pub config: PlannerConfig,

    pub start: GeoPoint,

    /// "complete", "budget_exhausted" or "empty"
    pub status: String,

    pub stats: PlanStats,

    /// Route in flight order
    pub waypoints: Vec<Waypoint>,

    /// Coarse slot indices in flight order
    pub coarse_path: Vec<usize>,

    /// Fine cells, row-major
    pub cells: Vec<CellRecord>,

    /// Qualifying coarse cells left out by the budget
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unvisited: Vec<usize>,
}

impl PlanExport {
    /// Builds an export from a finished plan.
    pub fn new(area: &str, config: &PlannerConfig, start: GeoPoint, plan: &SearchPlan) -> Self {
        let map = &plan.probability_map;
        let cells = map
            .cells()
            .filter_map(|(index, cell)| {
                let (row, col) = map.position(index)?;
                let center = map.geographic_center(index)?;
                Some(CellRecord {
                    index,
                    row,
                    col,
                    latitude: center.latitude,
                    longitude: center.longitude,
                    probability: cell.probability(),
                    visited: cell.is_visited(),
                })
            })
            .collect();

        Self {
            area: area.to_string(),
            config: config.clone(),
            start,
            status: plan.status.name().to_string(),
            stats: plan.stats,
            waypoints: plan.waypoints.clone(),
            coarse_path: plan.coarse_path.clone(),
            cells,
            unvisited: plan.unvisited().to_vec(),
        }
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}
