//! Geometry helpers shared by every planning stage.
//!
//! Two coordinate spaces are in play:
//! - **Geographic**: [`GeoPoint`] latitude/longitude in degrees (WGS84)
//! - **Local**: planar meters in a [`LocalFrame`], x east and y north of the
//!   frame origin, rotated by the frame heading
//!
//! All grid work happens in the local frame; geographic coordinates only
//! appear at the boundaries (polygon input, seed hints, waypoint output).

use geo::line_intersection::{line_intersection, LineIntersection};
use geo::{coord, Area, BoundingRect, Contains, Coord, HaversineDistance, Line, LineString, Point, Polygon, Rect};
use nalgebra::{Rotation2, Vector2};
use serde::{Deserialize, Serialize};

use crate::error::{PlanError, PlanResult};

/// WGS84 equatorial radius used by the equirectangular projection
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Polygons with less area than this (m²) are treated as degenerate
pub const MIN_POLYGON_AREA_M2: f64 = 1e-6;

/// A geographic position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// True when both components are finite and within WGS84 ranges.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    fn to_point(self) -> Point<f64> {
        Point::new(self.longitude, self.latitude)
    }
}

/// Great-circle distance in meters.
pub fn haversine_distance(a: GeoPoint, b: GeoPoint) -> f64 {
    a.to_point().haversine_distance(&b.to_point())
}

/// Euclidean distance in meters between two local-frame points.
pub fn planar_distance(a: Coord<f64>, b: Coord<f64>) -> f64 {
    (Vector2::new(a.x, a.y) - Vector2::new(b.x, b.y)).norm()
}

/// Axis-aligned bounding box of a polygon, `None` for an empty polygon.
pub fn bounding_box(polygon: &Polygon<f64>) -> Option<Rect<f64>> {
    polygon.bounding_rect()
}

/// Strict point-in-polygon test; points on the boundary are outside.
pub fn point_in_polygon(polygon: &Polygon<f64>, point: Coord<f64>) -> bool {
    polygon.contains(&Point::from(point))
}

/// Inclusive containment test for a rectangle.
pub fn rect_contains(rect: &Rect<f64>, point: Coord<f64>) -> bool {
    point.x >= rect.min().x && point.x <= rect.max().x && point.y >= rect.min().y && point.y <= rect.max().y
}

/// Rotates `point` by `theta` radians (counter-clockwise) about `pivot`.
pub fn rotate_point(point: Coord<f64>, theta: f64, pivot: Coord<f64>) -> Coord<f64> {
    let offset = Vector2::new(point.x - pivot.x, point.y - pivot.y);
    let rotated = Rotation2::new(theta) * offset;
    coord! { x: rotated.x + pivot.x, y: rotated.y + pivot.y }
}

/// Heading (radians from the local x axis) of the longest polygon edge.
///
/// Returns 0.0 for fewer than two vertices.
pub fn longest_edge_heading(vertices: &[Coord<f64>]) -> f64 {
    if vertices.len() < 2 {
        return 0.0;
    }

    let mut best_len = 0.0;
    let mut heading = 0.0;
    for i in 0..vertices.len() {
        let a = vertices[i];
        let b = vertices[(i + 1) % vertices.len()];
        let len = planar_distance(a, b);
        if len > best_len {
            best_len = len;
            heading = (b.y - a.y).atan2(b.x - a.x);
        }
    }
    heading
}

/// Builds a polygon from local vertices, rejecting anything that is not a
/// simple polygon with non-zero area.
///
/// A trailing vertex equal to the first is dropped, as are consecutive
/// duplicates.
pub fn simple_polygon(vertices: &[Coord<f64>]) -> PlanResult<Polygon<f64>> {
    if vertices.iter().any(|v| !v.x.is_finite() || !v.y.is_finite()) {
        return Err(PlanError::geometry("polygon has non-finite coordinates"));
    }

    let mut ring: Vec<Coord<f64>> = Vec::with_capacity(vertices.len());
    for v in vertices {
        if ring.last() != Some(v) {
            ring.push(*v);
        }
    }
    while ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }

    if ring.len() < 3 {
        return Err(PlanError::geometry(format!(
            "polygon needs at least 3 distinct vertices, got {}",
            ring.len()
        )));
    }

    let edges: Vec<Line<f64>> = (0..ring.len())
        .map(|i| Line::new(ring[i], ring[(i + 1) % ring.len()]))
        .collect();

    for i in 0..edges.len() {
        for j in (i + 1)..edges.len() {
            let adjacent = j == i + 1 || (i == 0 && j == edges.len() - 1);
            match line_intersection(edges[i], edges[j]) {
                None => {}
                Some(LineIntersection::Collinear { intersection }) if intersection.start != intersection.end => {
                    return Err(PlanError::geometry(format!("edges {} and {} overlap", i, j)));
                }
                Some(_) if adjacent => {}
                Some(_) => {
                    return Err(PlanError::geometry(format!("edges {} and {} intersect", i, j)));
                }
            }
        }
    }

    let polygon = Polygon::new(LineString::from(ring), vec![]);
    if polygon.unsigned_area() < MIN_POLYGON_AREA_M2 {
        return Err(PlanError::geometry("polygon has zero area"));
    }

    Ok(polygon)
}

/// Planar projection anchored at a geographic origin.
///
/// Uses an equirectangular approximation, which is accurate to well under a
/// meter across the few-kilometer extents a search area covers. The heading
/// rotates the planar axes so a grid built in this frame can follow the
/// search area's orientation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocalFrame {
    pub origin: GeoPoint,
    /// Grid x axis heading in radians, counter-clockwise from east
    pub heading: f64,
}

impl LocalFrame {
    pub fn new(origin: GeoPoint) -> Self {
        Self { origin, heading: 0.0 }
    }

    pub fn with_heading(mut self, heading: f64) -> Self {
        self.heading = heading;
        self
    }

    /// Geographic → local meters.
    pub fn to_local(&self, point: GeoPoint) -> Coord<f64> {
        let lat0 = self.origin.latitude.to_radians();
        let east = (point.longitude - self.origin.longitude).to_radians() * EARTH_RADIUS_M * lat0.cos();
        let north = (point.latitude - self.origin.latitude).to_radians() * EARTH_RADIUS_M;

        let v = Rotation2::new(-self.heading) * Vector2::new(east, north);
        coord! { x: v.x, y: v.y }
    }

    /// Local meters → geographic.
    pub fn to_geographic(&self, point: Coord<f64>) -> GeoPoint {
        let lat0 = self.origin.latitude.to_radians();
        let v = Rotation2::new(self.heading) * Vector2::new(point.x, point.y);

        GeoPoint {
            latitude: self.origin.latitude + (v.y / EARTH_RADIUS_M).to_degrees(),
            longitude: self.origin.longitude + (v.x / (EARTH_RADIUS_M * lat0.cos())).to_degrees(),
        }
    }
}
