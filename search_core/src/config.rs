//! Planner configuration.
//!
//! Every struct here has a `Default` and deserializes with missing fields
//! filled from that default, so a JSON config file only needs to name the
//! values it changes.

use serde::{Deserialize, Serialize};

use crate::compressor::{max_probability, sum_probabilities, AggregateFn};
use crate::error::{PlanError, PlanResult};

/// How the fine grid is oriented relative to the search area.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridAlignment {
    /// Grid columns run east, rows run north
    #[default]
    North,
    /// Grid x axis at a fixed heading (radians, counter-clockwise from east)
    Heading(f64),
    /// Grid x axis follows the polygon's longest edge
    LongestEdge,
}

/// How fine probabilities are combined into a coarse cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationPolicy {
    /// Favors coarse cells holding many plausible fine cells
    #[default]
    Sum,
    /// "Any hit matters": a coarse cell is as likely as its best fine cell
    Max,
}

impl AggregationPolicy {
    pub fn aggregate_fn(self) -> AggregateFn {
        match self {
            AggregationPolicy::Sum => sum_probabilities,
            AggregationPolicy::Max => max_probability,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AggregationPolicy::Sum => "sum",
            AggregationPolicy::Max => "max",
        }
    }
}

impl std::str::FromStr for AggregationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sum" => Ok(AggregationPolicy::Sum),
            "max" => Ok(AggregationPolicy::Max),
            _ => Err(format!("Unknown aggregation: {} (expected sum or max)", s)),
        }
    }
}

/// Prior probability model used by the segmenter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorConfig {
    /// Expected number of targets in the area; spread uniformly over all
    /// included cells as the base probability
    pub target_count: f64,

    /// Spread (meters) of a seed hint that does not set its own
    pub default_seed_sigma_m: f64,
}

impl Default for PriorConfig {
    fn default() -> Self {
        Self {
            target_count: 1.0,
            default_seed_sigma_m: 30.0,
        }
    }
}

impl PriorConfig {
    pub fn validate(&self) -> PlanResult<()> {
        if !(self.target_count.is_finite() && self.target_count >= 0.0) {
            return Err(PlanError::parameter(
                "prior.target_count",
                format!("must be >= 0, got {}", self.target_count),
            ));
        }
        if !(self.default_seed_sigma_m.is_finite() && self.default_seed_sigma_m > 0.0) {
            return Err(PlanError::parameter(
                "prior.default_seed_sigma_m",
                format!("must be > 0, got {}", self.default_seed_sigma_m),
            ));
        }
        Ok(())
    }
}

/// Caps on the planned path. `None` means unconstrained.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PathBudget {
    /// Maximum number of coarse cells in the path
    pub max_cells: Option<usize>,

    /// Maximum cumulative travel between coarse cell centers, start leg
    /// included (meters)
    pub max_distance_m: Option<f64>,
}

impl PathBudget {
    pub fn unconstrained() -> Self {
        Self::default()
    }

    pub fn with_max_cells(mut self, cells: usize) -> Self {
        self.max_cells = Some(cells);
        self
    }

    pub fn with_max_distance(mut self, meters: f64) -> Self {
        self.max_distance_m = Some(meters);
        self
    }
}

/// Full configuration for one planning request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Fine grid cell side length in meters
    pub cell_size_m: f64,

    /// Fine grid orientation
    pub alignment: GridAlignment,

    /// Fine cells per coarse cell side (k)
    pub compression_factor: usize,

    /// Coarse probability aggregation
    pub aggregation: AggregationPolicy,

    /// Coarse cells must exceed this probability to be planned
    pub min_probability: f64,

    /// Path length caps
    pub budget: PathBudget,

    /// Altitude assigned to every waypoint (meters)
    pub altitude_m: f64,

    /// Prior probability model
    pub prior: PriorConfig,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            cell_size_m: 10.0,
            alignment: GridAlignment::North,
            compression_factor: 3,
            aggregation: AggregationPolicy::Sum,
            min_probability: 0.0,
            budget: PathBudget::unconstrained(),
            // 100 ft search altitude
            altitude_m: 30.48,
            prior: PriorConfig::default(),
        }
    }
}

impl PlannerConfig {
    /// Parses a (possibly partial) JSON config.
    pub fn from_json(json: &str) -> PlanResult<Self> {
        serde_json::from_str(json).map_err(|e| PlanError::parameter("config", e.to_string()))
    }

    /// Checks every parameter before any grid is built.
    pub fn validate(&self) -> PlanResult<()> {
        if !(self.cell_size_m.is_finite() && self.cell_size_m > 0.0) {
            return Err(PlanError::InvalidResolution(self.cell_size_m));
        }
        if self.compression_factor == 0 {
            return Err(PlanError::InvalidCompressionFactor(0));
        }
        if let GridAlignment::Heading(h) = self.alignment {
            if !h.is_finite() {
                return Err(PlanError::parameter("alignment", "heading must be finite"));
            }
        }
        validate_threshold(self.min_probability)?;
        validate_budget(&self.budget)?;
        if !self.altitude_m.is_finite() {
            return Err(PlanError::parameter("altitude_m", "must be finite"));
        }
        self.prior.validate()
    }
}

pub(crate) fn validate_threshold(min_probability: f64) -> PlanResult<()> {
    if !(min_probability.is_finite() && min_probability >= 0.0) {
        return Err(PlanError::parameter(
            "min_probability",
            format!("must be a finite value >= 0, got {}", min_probability),
        ));
    }
    Ok(())
}

pub(crate) fn validate_budget(budget: &PathBudget) -> PlanResult<()> {
    if let Some(d) = budget.max_distance_m {
        if !(d.is_finite() && d > 0.0) {
            return Err(PlanError::parameter("budget.max_distance_m", format!("must be > 0, got {}", d)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(PlannerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config = PlannerConfig::from_json(
            r#"{ "cell_size_m": 5.0, "aggregation": "max", "budget": { "max_cells": 12 } }"#,
        )
        .unwrap();

        assert_eq!(config.cell_size_m, 5.0);
        assert_eq!(config.aggregation, AggregationPolicy::Max);
        assert_eq!(config.budget.max_cells, Some(12));
        assert_eq!(config.budget.max_distance_m, None);
        assert_eq!(config.compression_factor, 3);
    }

    #[test]
    fn test_alignment_json_forms() {
        let config = PlannerConfig::from_json(r#"{ "alignment": { "heading": 0.5 } }"#).unwrap();
        assert_eq!(config.alignment, GridAlignment::Heading(0.5));

        let config = PlannerConfig::from_json(r#"{ "alignment": "longest_edge" }"#).unwrap();
        assert_eq!(config.alignment, GridAlignment::LongestEdge);
    }

    #[test]
    fn test_malformed_json_is_parameter_error() {
        let err = PlannerConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, PlanError::InvalidParameter { name: "config", .. }));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = PlannerConfig::default();
        config.cell_size_m = 0.0;
        assert_eq!(config.validate(), Err(PlanError::InvalidResolution(0.0)));

        let mut config = PlannerConfig::default();
        config.compression_factor = 0;
        assert_eq!(config.validate(), Err(PlanError::InvalidCompressionFactor(0)));

        let mut config = PlannerConfig::default();
        config.min_probability = -1.0;
        assert!(config.validate().is_err());

        let mut config = PlannerConfig::default();
        config.budget = PathBudget::unconstrained().with_max_distance(0.0);
        assert!(config.validate().is_err());

        let mut config = PlannerConfig::default();
        config.prior.default_seed_sigma_m = 0.0;
        assert!(matches!(
            config.validate(),
            Err(PlanError::InvalidParameter { name: "prior.default_seed_sigma_m", .. })
        ));
    }

    #[test]
    fn test_aggregation_from_str() {
        assert_eq!("MAX".parse::<AggregationPolicy>(), Ok(AggregationPolicy::Max));
        assert!("mean".parse::<AggregationPolicy>().is_err());
    }
}
