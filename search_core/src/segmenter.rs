//! Polygon → probability-weighted fine grid.
//!
//! The search boundary is projected into a [`LocalFrame`] anchored at its
//! first vertex (rotated per [`GridAlignment`]), its bounding box is tiled
//! into square cells, and a cell is kept when its centroid lies strictly
//! inside the polygon. Kept cells start at a uniform base probability plus
//! a Gaussian bump around each seed hint.

use geo::{coord, Coord, Rect};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cell::Cell;
use crate::cell_map::CellMap;
use crate::config::{GridAlignment, PriorConfig};
use crate::error::{PlanError, PlanResult};
use crate::geo_helpers::{bounding_box, longest_edge_heading, planar_distance, point_in_polygon, simple_polygon, GeoPoint, LocalFrame};

/// Grids larger than this are refused as a resolution error
pub const MAX_GRID_SLOTS: usize = 4_000_000;

/// Relative slack so projection round-off does not add a sliver row
const SPAN_TOLERANCE: f64 = 1e-6;

/// An a priori hint that the target is near `location`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProbabilitySeed {
    pub location: GeoPoint,

    /// Peak probability added at the seed location
    pub weight: f64,

    /// Gaussian spread in meters; falls back to the prior's default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sigma_m: Option<f64>,
}

impl ProbabilitySeed {
    pub fn new(location: GeoPoint, weight: f64) -> Self {
        Self {
            location,
            weight,
            sigma_m: None,
        }
    }

    pub fn with_sigma(mut self, sigma_m: f64) -> Self {
        self.sigma_m = Some(sigma_m);
        self
    }
}

/// Builds fine [`CellMap`]s from search boundaries.
#[derive(Debug, Clone)]
pub struct Segmenter {
    cell_size_m: f64,
    alignment: GridAlignment,
    prior: PriorConfig,
}

impl Segmenter {
    pub fn new(cell_size_m: f64) -> Self {
        Self {
            cell_size_m,
            alignment: GridAlignment::North,
            prior: PriorConfig::default(),
        }
    }

    pub fn with_alignment(mut self, alignment: GridAlignment) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn with_prior(mut self, prior: PriorConfig) -> Self {
        self.prior = prior;
        self
    }

    /// Segments `boundary` into a fine probability grid.
    ///
    /// # Errors
    /// * `InvalidResolution` - non-positive cell size, or a size so fine or
    ///   so coarse that the grid is unusable
    /// * `InvalidGeometry` - malformed, degenerate or self-intersecting
    ///   boundary
    /// * `InvalidParameter` - malformed seed hint or prior
    pub fn segment(&self, boundary: &[GeoPoint], seeds: &[ProbabilitySeed]) -> PlanResult<CellMap> {
        let size = self.cell_size_m;
        if !(size.is_finite() && size > 0.0) {
            return Err(PlanError::InvalidResolution(size));
        }
        self.prior.validate()?;
        if let Some(bad) = boundary.iter().find(|p| !p.is_valid()) {
            return Err(PlanError::geometry(format!("vertex {:?} is not a valid position", bad)));
        }
        let origin = *boundary
            .first()
            .ok_or_else(|| PlanError::geometry("boundary has no vertices"))?;
        for seed in seeds {
            self.check_seed(seed)?;
        }

        let frame = self.frame_for(origin, boundary);
        let local: Vec<Coord<f64>> = boundary.iter().map(|p| frame.to_local(*p)).collect();
        let polygon = simple_polygon(&local)?;
        let bbox = bounding_box(&polygon).ok_or_else(|| PlanError::geometry("polygon has no bounding box"))?;

        let rows = slot_span(bbox.height(), size);
        let cols = slot_span(bbox.width(), size);
        if rows.saturating_mul(cols) > MAX_GRID_SLOTS {
            return Err(PlanError::InvalidResolution(size));
        }

        // Never end short of the bounding box when the span trim drops a
        // round-off sliver
        let (min, max) = (bbox.min(), bbox.max());
        let extent = Rect::new(
            min,
            coord! {
                x: (min.x + cols as f64 * size).max(max.x),
                y: (min.y + rows as f64 * size).max(max.y),
            },
        );

        let inside: Vec<Option<Rect<f64>>> = (0..rows * cols)
            .map(|i| {
                let bounds = CellMap::slot_bounds(&extent, size, i / cols, i % cols);
                point_in_polygon(&polygon, bounds.center()).then_some(bounds)
            })
            .collect();

        let included = inside.iter().filter(|s| s.is_some()).count();
        if included == 0 {
            // Polygon is valid but thinner than one cell everywhere
            return Err(PlanError::InvalidResolution(size));
        }

        let base = self.prior.target_count / included as f64;
        let seed_centers: Vec<(Coord<f64>, f64, f64)> = seeds
            .iter()
            .map(|s| {
                let sigma = s.sigma_m.unwrap_or(self.prior.default_seed_sigma_m);
                (frame.to_local(s.location), s.weight, sigma)
            })
            .collect();

        let slots = inside
            .into_iter()
            .map(|slot| {
                slot.map(|bounds| {
                    let center = bounds.center();
                    let bump: f64 = seed_centers
                        .iter()
                        .map(|&(at, weight, sigma)| {
                            let d = planar_distance(center, at);
                            weight * (-(d * d) / (2.0 * sigma * sigma)).exp()
                        })
                        .sum();
                    Cell::new(bounds, base + bump)
                })
            })
            .collect();

        debug!(rows, cols, included, seeds = seeds.len(), cell_size_m = size, "segmented search area");

        CellMap::from_slots(rows, cols, size, frame, extent, slots)
    }

    fn frame_for(&self, origin: GeoPoint, boundary: &[GeoPoint]) -> LocalFrame {
        let frame = LocalFrame::new(origin);
        let heading = match self.alignment {
            GridAlignment::North => 0.0,
            GridAlignment::Heading(h) => h,
            GridAlignment::LongestEdge => {
                let local: Vec<Coord<f64>> = boundary.iter().map(|p| frame.to_local(*p)).collect();
                longest_edge_heading(&local)
            }
        };
        frame.with_heading(heading)
    }

    fn check_seed(&self, seed: &ProbabilitySeed) -> PlanResult<()> {
        if !seed.location.is_valid() {
            return Err(PlanError::parameter("seed.location", format!("{:?} is not a valid position", seed.location)));
        }
        if !(seed.weight.is_finite() && seed.weight >= 0.0) {
            return Err(PlanError::parameter("seed.weight", format!("must be >= 0, got {}", seed.weight)));
        }
        if let Some(sigma) = seed.sigma_m {
            if !(sigma.is_finite() && sigma > 0.0) {
                return Err(PlanError::parameter("seed.sigma_m", format!("must be > 0, got {}", sigma)));
            }
        }
        Ok(())
    }
}

fn slot_span(length: f64, size: f64) -> usize {
    ((length / size - SPAN_TOLERANCE).ceil() as usize).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo_helpers::rect_contains;
    use approx::assert_relative_eq;
    use std::collections::HashSet;

    const ORIGIN: GeoPoint = GeoPoint {
        latitude: 38.3144,
        longitude: -76.5452,
    };

    /// Boundary whose local projection is the given planar polygon.
    fn boundary(local: &[(f64, f64)]) -> Vec<GeoPoint> {
        let frame = LocalFrame::new(ORIGIN);
        local.iter().map(|&(x, y)| frame.to_geographic(coord! { x: x, y: y })).collect()
    }

    fn square(side: f64) -> Vec<GeoPoint> {
        boundary(&[(0.0, 0.0), (side, 0.0), (side, side), (0.0, side)])
    }

    #[test]
    fn test_square_tiles_fully() {
        let map = Segmenter::new(10.0).segment(&square(30.0), &[]).unwrap();

        assert_eq!(map.rows(), 3);
        assert_eq!(map.cols(), 3);
        assert_eq!(map.len(), 9);
        for (_, cell) in map.cells() {
            assert_relative_eq!(cell.probability(), 1.0 / 9.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_l_shape_excludes_notch() {
        // 20x20 square missing its north-east 10x10 quadrant
        let l = boundary(&[(0.0, 0.0), (20.0, 0.0), (20.0, 10.0), (10.0, 10.0), (10.0, 20.0), (0.0, 20.0)]);
        let map = Segmenter::new(10.0).segment(&l, &[]).unwrap();

        assert_eq!((map.rows(), map.cols()), (2, 2));
        assert_eq!(map.len(), 3);
        assert!(map.get(1, 1).is_none());
    }

    #[test]
    fn test_cells_stay_inside_extent_without_duplicates() {
        let tri = boundary(&[(0.0, 0.0), (95.0, 5.0), (40.0, 70.0)]);
        let map = Segmenter::new(7.0).segment(&tri, &[]).unwrap();
        let extent = map.extent();

        let mut seen = HashSet::new();
        for (i, cell) in map.cells() {
            assert!(seen.insert(i));
            let b = cell.bounds();
            assert!(rect_contains(&extent, b.min()) && rect_contains(&extent, b.max()));
        }
        assert!(map.len() > 0);
    }

    #[test]
    fn test_seed_raises_nearby_cells() {
        let frame = LocalFrame::new(ORIGIN);
        let seed = ProbabilitySeed::new(frame.to_geographic(coord! { x: 5.0, y: 5.0 }), 2.0).with_sigma(5.0);

        let map = Segmenter::new(10.0).segment(&square(30.0), &[seed]).unwrap();

        let near = map.get(0, 0).unwrap().probability();
        let far = map.get(2, 2).unwrap().probability();
        assert!(near > far);
        assert_relative_eq!(near, 1.0 / 9.0 + 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_target_count_scales_base() {
        let prior = PriorConfig {
            target_count: 4.0,
            ..PriorConfig::default()
        };
        let map = Segmenter::new(10.0).with_prior(prior).segment(&square(20.0), &[]).unwrap();
        assert_relative_eq!(map.total_probability(), 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_longest_edge_alignment_rotates_grid() {
        // Thin rectangle at 45 degrees; aligned grid needs far fewer slots
        let d = std::f64::consts::FRAC_1_SQRT_2;
        let thin = boundary(&[
            (0.0, 0.0),
            (100.0 * d, 100.0 * d),
            (100.0 * d - 10.0 * d, 100.0 * d + 10.0 * d),
            (-10.0 * d, 10.0 * d),
        ]);

        let north = Segmenter::new(5.0).segment(&thin, &[]).unwrap();
        let aligned = Segmenter::new(5.0)
            .with_alignment(GridAlignment::LongestEdge)
            .segment(&thin, &[])
            .unwrap();

        assert!(aligned.slot_count() < north.slot_count());
        assert_eq!(aligned.len(), 40);
        assert_relative_eq!(aligned.frame().heading, std::f64::consts::FRAC_PI_4, epsilon = 1e-6);
    }

    #[test]
    fn test_degenerate_polygon_is_invalid_geometry() {
        let line = boundary(&[(0.0, 0.0), (50.0, 0.0), (100.0, 0.0)]);
        let err = Segmenter::new(10.0).segment(&line, &[]).unwrap_err();
        assert!(matches!(err, PlanError::InvalidGeometry(_)));
    }

    #[test]
    fn test_self_intersecting_polygon_is_invalid_geometry() {
        let bowtie = boundary(&[(0.0, 0.0), (40.0, 40.0), (40.0, 0.0), (0.0, 40.0)]);
        assert!(matches!(
            Segmenter::new(10.0).segment(&bowtie, &[]),
            Err(PlanError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn test_non_positive_resolution() {
        assert_eq!(
            Segmenter::new(0.0).segment(&square(30.0), &[]).unwrap_err(),
            PlanError::InvalidResolution(0.0)
        );
        assert!(matches!(
            Segmenter::new(-3.0).segment(&square(30.0), &[]),
            Err(PlanError::InvalidResolution(_))
        ));
    }

    #[test]
    fn test_bad_prior_rejected() {
        let prior = PriorConfig {
            target_count: -5.0,
            ..PriorConfig::default()
        };
        assert!(matches!(
            Segmenter::new(10.0).with_prior(prior).segment(&square(30.0), &[]),
            Err(PlanError::InvalidParameter { name: "prior.target_count", .. })
        ));

        let prior = PriorConfig {
            default_seed_sigma_m: 0.0,
            ..PriorConfig::default()
        };
        let seed = ProbabilitySeed::new(ORIGIN, 1.0);
        assert!(matches!(
            Segmenter::new(10.0).with_prior(prior).segment(&square(30.0), &[seed]),
            Err(PlanError::InvalidParameter { name: "prior.default_seed_sigma_m", .. })
        ));
    }

    #[test]
    fn test_extent_covers_bounding_box() {
        let frame = LocalFrame::new(ORIGIN);
        for side in [30.0, 40.0, 70.0, 120.0, 300.0] {
            let map = Segmenter::new(10.0).segment(&square(side), &[]).unwrap();
            let corner = frame.to_local(frame.to_geographic(coord! { x: side, y: side }));
            assert!(rect_contains(&map.extent(), corner), "side {} cuts off the far corner", side);
            assert_eq!(map.cols(), (side / 10.0) as usize);
        }
    }

    #[test]
    fn test_bad_seed_rejected() {
        let seed = ProbabilitySeed::new(ORIGIN, -1.0);
        assert!(matches!(
            Segmenter::new(10.0).segment(&square(30.0), &[seed]),
            Err(PlanError::InvalidParameter { name: "seed.weight", .. })
        ));
    }
}
