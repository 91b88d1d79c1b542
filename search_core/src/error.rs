//! Error types for search area planning.

use thiserror::Error;

/// Errors that abort a planning run.
///
/// Budget exhaustion and empty results are not errors; they are reported
/// through [`crate::PlanStatus`] alongside the (possibly partial) path.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    /// Search polygon is degenerate, self-intersecting or malformed
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Grid cell size is not a positive finite number of meters
    #[error("Invalid resolution: {0} m")]
    InvalidResolution(f64),

    /// Compression factor must be at least 1
    #[error("Invalid compression factor: {0}")]
    InvalidCompressionFactor(usize),

    /// A planning parameter is out of range
    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// Vehicle start lies outside the grid's bounding box
    #[error("Start position ({latitude:.7}, {longitude:.7}) lies outside the search grid")]
    NoStartPosition { latitude: f64, longitude: f64 },

    /// The flight-control collaborator refused the waypoint list
    #[error("Flight controller rejected waypoints: {0}")]
    FlightRejected(String),
}

impl PlanError {
    /// Creates a geometry error.
    pub fn geometry(msg: impl Into<String>) -> Self {
        Self::InvalidGeometry(msg.into())
    }

    /// Creates a parameter error.
    pub fn parameter(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// Result alias used throughout the planner.
pub type PlanResult<T> = Result<T, PlanError>;
