//! Reference search areas.

use search_core::GeoPoint;

const AIR_DROP: [(f64, f64); 4] = [
    (38.31442311312976, -76.54522971451763),
    (38.31421041772561, -76.54400246436776),
    (38.3144070396263, -76.54394394383165),
    (38.31461622313521, -76.54516993186949),
];

const SEARCH_FIELD: [(f64, f64); 13] = [
    (38.31722979755967, -76.5570186342245),
    (38.3160801028265, -76.55731984244503),
    (38.31600059675041, -76.5568902018946),
    (38.31546739500083, -76.5537620127769),
    (38.31470980862425, -76.5493636141453),
    (38.31424154692598, -76.5466276164690),
    (38.31369801280048, -76.5434238005822),
    (38.3131406794544, -76.54011767488228),
    (38.31508631356025, -76.5396286507867),
    (38.31615083692682, -76.5449773879351),
    (38.31734210679102, -76.5446085046679),
    (38.31859044679581, -76.5519329158383),
    (38.3164700703248, -76.55255360208943),
];

/// Roughly 300 m on a side
const SQUARE: [(f64, f64); 4] = [
    (38.3140, -76.5460),
    (38.3140, -76.5426),
    (38.3167, -76.5426),
    (38.3167, -76.5460),
];

/// Area identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AreaId {
    /// Narrow drop zone at an angle to north
    AirDrop,

    /// Large irregular field boundary
    SearchField,

    /// Axis-aligned square, handy for sanity checks
    Square,
}

impl AreaId {
    /// Returns a list of all areas.
    pub fn all() -> Vec<AreaId> {
        vec![AreaId::AirDrop, AreaId::SearchField, AreaId::Square]
    }

    /// Returns the area name.
    pub fn name(&self) -> &'static str {
        match self {
            AreaId::AirDrop => "air_drop",
            AreaId::SearchField => "search_field",
            AreaId::Square => "square",
        }
    }

    /// Returns a description of the area.
    pub fn description(&self) -> &'static str {
        match self {
            AreaId::AirDrop => "~110 x 25 m drop zone, long axis ~12° off east",
            AreaId::SearchField => "~1.5 km x 600 m irregular 13-vertex field",
            AreaId::Square => "~300 m north-aligned square",
        }
    }

    /// Boundary vertices, open ring.
    pub fn boundary(&self) -> Vec<GeoPoint> {
        let vertices: &[(f64, f64)] = match self {
            AreaId::AirDrop => &AIR_DROP,
            AreaId::SearchField => &SEARCH_FIELD,
            AreaId::Square => &SQUARE,
        };
        vertices.iter().map(|&(lat, lon)| GeoPoint::new(lat, lon)).collect()
    }

    /// Launch position: the first boundary vertex.
    pub fn default_start(&self) -> GeoPoint {
        let (lat, lon) = match self {
            AreaId::AirDrop => AIR_DROP[0],
            AreaId::SearchField => SEARCH_FIELD[0],
            AreaId::Square => SQUARE[0],
        };
        GeoPoint::new(lat, lon)
    }
}

impl std::fmt::Display for AreaId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for AreaId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "air_drop" | "airdrop" => Ok(AreaId::AirDrop),
            "search_field" | "searchfield" | "field" => Ok(AreaId::SearchField),
            "square" => Ok(AreaId::Square),
            _ => Err(format!("Unknown area: {} (expected air_drop, search_field or square)", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use search_core::{PlanRequest, PlannerConfig, SearchPlanner};

    #[test]
    fn test_names_round_trip() {
        for area in AreaId::all() {
            assert_eq!(area.name().parse::<AreaId>().unwrap(), area);
            assert_eq!(area.to_string(), area.name());
        }
        assert!("lake".parse::<AreaId>().is_err());
    }

    #[test]
    fn test_every_area_plans() {
        let planner = SearchPlanner::new(PlannerConfig::default());
        for area in AreaId::all() {
            let plan = planner
                .plan(&PlanRequest::new(area.boundary(), area.default_start()))
                .unwrap();
            assert!(plan.is_complete(), "{} did not complete", area);
            assert!(!plan.waypoints.is_empty());
        }
    }
}
