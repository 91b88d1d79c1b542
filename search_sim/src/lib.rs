//! Search Planner Simulator
//!
//! Runs the planning pipeline from `search_core` against reference search
//! areas and reports, exports or "flies" the resulting route.
//!
//! # Usage
//!
//! ```ignore
//! use search_core::{PlanRequest, PlannerConfig, SearchPlanner};
//! use search_sim::{AreaId, PlanReport};
//!
//! let area = AreaId::AirDrop;
//! let config = PlannerConfig::default();
//! let plan = SearchPlanner::new(config.clone())
//!     .plan(&PlanRequest::new(area.boundary(), area.default_start()))?;
//!
//! PlanReport::new(area.name(), &config, &plan).print();
//! ```

pub mod areas;
pub mod exporter;
pub mod report;

pub use areas::AreaId;
pub use exporter::{CellRecord, PlanExport};
pub use report::PlanReport;
