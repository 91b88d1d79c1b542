//! Search Core - Probability-Driven Area Search Planning
//!
//! Turns a search-area polygon into a flyable waypoint route for a single
//! aerial vehicle:
//! 1. **Segmentation**: tile the polygon into a fine probability grid
//! 2. **Compression**: aggregate k×k fine blocks into a coarse grid with an
//!    exact mapping back
//! 3. **Planning**: greedy probability-per-distance ordering of coarse cells
//! 4. **Decompression**: expand each coarse cell into fine waypoints
//!
//! [`SearchPlanner`] runs all four stages; each stage is also usable on its own.

pub mod cell;
pub mod cell_map;
pub mod compressor;
pub mod config;
pub mod decompressor;
pub mod error;
pub mod geo_helpers;
pub mod pipeline;
pub mod planner;
pub mod segmenter;

// Re-export key types for convenience
pub use cell::Cell;
pub use cell_map::{CellMap, Connectivity};
pub use compressor::{max_probability, sum_probabilities, AggregateFn, CompressionMap, Compressor};
pub use config::{AggregationPolicy, GridAlignment, PathBudget, PlannerConfig, PriorConfig};
pub use decompressor::{Decompressor, ExpandedRoute, Waypoint};
pub use error::{PlanError, PlanResult};
pub use geo_helpers::{haversine_distance, GeoPoint, LocalFrame};
pub use pipeline::{FlightSink, PlanRequest, PlanStats, SearchPlan, SearchPlanner};
pub use planner::{CoveragePath, PathPlanner, PlanStatus};
pub use segmenter::{ProbabilitySeed, Segmenter};
