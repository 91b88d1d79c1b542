//! Coarse path → fine waypoints.
//!
//! Each coarse cell in the path is expanded into its fine constituents,
//! ordered by a nearest-neighbor sub-tour that starts from wherever the
//! vehicle enters the block (the previous waypoint, or the start position
//! for the first block). The expansion depends only on its inputs.

use std::collections::HashSet;

use geo::Coord;
use serde::{Deserialize, Serialize};

use crate::cell_map::CellMap;
use crate::compressor::CompressionMap;
use crate::error::{PlanError, PlanResult};
use crate::geo_helpers::{planar_distance, GeoPoint};

/// A position the flight controller can fly to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub latitude: f64,
    pub longitude: f64,
    /// Meters
    pub altitude: f64,
}

/// Fine-resolution route produced by [`Decompressor::expand`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpandedRoute {
    /// Fine slot indices in flight order
    pub fine_cells: Vec<usize>,
    /// One waypoint per fine cell, same order
    pub waypoints: Vec<Waypoint>,
    /// Start → first waypoint → ... → last waypoint (meters)
    pub travel_distance_m: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct Decompressor {
    altitude_m: f64,
}

impl Decompressor {
    pub fn new(altitude_m: f64) -> Self {
        Self { altitude_m }
    }

    /// Expands a coarse path into fine waypoints.
    ///
    /// # Errors
    /// `InvalidParameter` when the path names a coarse cell twice or a cell
    /// with no constituents, or when `mapping` was not built from `fine`.
    pub fn expand(
        &self,
        path: &[usize],
        mapping: &CompressionMap,
        fine: &CellMap,
        start: GeoPoint,
    ) -> PlanResult<ExpandedRoute> {
        if mapping.fine_dims() != (fine.rows(), fine.cols()) {
            return Err(PlanError::parameter(
                "mapping",
                format!(
                    "built for a {:?} fine grid, got {}x{}",
                    mapping.fine_dims(),
                    fine.rows(),
                    fine.cols()
                ),
            ));
        }

        let frame = fine.frame();
        let mut position = frame.to_local(start);
        let mut seen = HashSet::with_capacity(path.len());
        let mut fine_cells = Vec::new();
        let mut travelled = 0.0;

        for &coarse in path {
            if !seen.insert(coarse) {
                return Err(PlanError::parameter("path", format!("coarse cell {} appears twice", coarse)));
            }

            let mut block: Vec<(usize, Coord<f64>)> = mapping
                .constituents(coarse)
                .iter()
                .map(|&i| {
                    fine.cell(i)
                        .map(|cell| (i, cell.center()))
                        .ok_or_else(|| PlanError::parameter("mapping", format!("fine cell {} is not in the map", i)))
                })
                .collect::<PlanResult<_>>()?;
            if block.is_empty() {
                return Err(PlanError::parameter("path", format!("coarse cell {} has no fine cells", coarse)));
            }

            // Nearest-neighbor sub-tour; `block` is ascending so the first
            // minimum is the lowest index
            while !block.is_empty() {
                let (pos, leg) = block
                    .iter()
                    .enumerate()
                    .map(|(k, &(_, center))| (k, planar_distance(position, center)))
                    .fold((0, f64::INFINITY), |best, cur| if cur.1 < best.1 { cur } else { best });

                let (index, center) = block.remove(pos);
                fine_cells.push(index);
                travelled += leg;
                position = center;
            }
        }

        let waypoints = fine_cells
            .iter()
            .filter_map(|&i| fine.cell(i))
            .map(|cell| {
                let p = frame.to_geographic(cell.center());
                Waypoint {
                    latitude: p.latitude,
                    longitude: p.longitude,
                    altitude: self.altitude_m,
                }
            })
            .collect();

        Ok(ExpandedRoute {
            fine_cells,
            waypoints,
            travel_distance_m: travelled,
        })
    }
}
