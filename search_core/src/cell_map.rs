//! The probability grid.
//!
//! A `CellMap` is a fixed `rows × cols` arena of slots addressed by
//! `(row, col)` or by flat row-major index `row * cols + col`. Row 0 is the
//! southern edge of the grid (minimum local y), column 0 the western edge
//! (minimum local x). A slot either holds exactly one [`Cell`] or is
//! excluded because it lies outside the search polygon.

use std::fmt;

use geo::{coord, Coord, Rect};
use serde::{Deserialize, Serialize};

use crate::cell::Cell;
use crate::error::{PlanError, PlanResult};
use crate::geo_helpers::{planar_distance, rect_contains, GeoPoint, LocalFrame};

/// Neighborhood used by [`CellMap::neighbors`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Connectivity {
    /// Edge-sharing neighbors only
    Four,
    /// Edge- and corner-sharing neighbors
    Eight,
}

impl Connectivity {
    fn offsets(self) -> &'static [(isize, isize)] {
        // Ordered so that neighbor indices come out ascending
        match self {
            Connectivity::Four => &[(-1, 0), (0, -1), (0, 1), (1, 0)],
            Connectivity::Eight => &[
                (-1, -1),
                (-1, 0),
                (-1, 1),
                (0, -1),
                (0, 1),
                (1, -1),
                (1, 0),
                (1, 1),
            ],
        }
    }
}

/// A grid of probability-weighted cells in a local frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellMap {
    rows: usize,
    cols: usize,
    /// Slot side length in meters; coarse cells cover only the union of
    /// their present fine cells, so their bounds can be smaller
    cell_size: f64,
    frame: LocalFrame,
    /// Planar extent covered by the slots
    extent: Rect<f64>,
    slots: Vec<Option<Cell>>,
}

impl CellMap {
    /// Builds a map from row-major slots.
    pub fn from_slots(
        rows: usize,
        cols: usize,
        cell_size: f64,
        frame: LocalFrame,
        extent: Rect<f64>,
        slots: Vec<Option<Cell>>,
    ) -> PlanResult<Self> {
        if rows == 0 || cols == 0 {
            return Err(PlanError::parameter("grid", format!("dimensions must be non-zero, got {}x{}", rows, cols)));
        }
        if slots.len() != rows * cols {
            return Err(PlanError::parameter(
                "slots",
                format!("expected {} slots for a {}x{} grid, got {}", rows * cols, rows, cols, slots.len()),
            ));
        }
        if !(cell_size.is_finite() && cell_size > 0.0) {
            return Err(PlanError::InvalidResolution(cell_size));
        }

        Ok(Self {
            rows,
            cols,
            cell_size,
            frame,
            extent,
            slots,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    pub fn frame(&self) -> &LocalFrame {
        &self.frame
    }

    /// Planar bounding box of the whole grid.
    pub fn extent(&self) -> Rect<f64> {
        self.extent
    }

    /// Number of slots, present or excluded (`rows * cols`).
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Number of present cells.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    pub fn index_of(&self, row: usize, col: usize) -> Option<usize> {
        (row < self.rows && col < self.cols).then(|| row * self.cols + col)
    }

    pub fn position(&self, index: usize) -> Option<(usize, usize)> {
        (index < self.slots.len()).then(|| (index / self.cols, index % self.cols))
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&Cell> {
        self.index_of(row, col).and_then(|i| self.cell(i))
    }

    pub fn cell(&self, index: usize) -> Option<&Cell> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Present cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (usize, &Cell)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|cell| (i, cell)))
    }

    /// Indices of present neighbors, ascending.
    pub fn neighbors(&self, index: usize, connectivity: Connectivity) -> Vec<usize> {
        let Some((row, col)) = self.position(index) else {
            return Vec::new();
        };

        connectivity
            .offsets()
            .iter()
            .filter_map(|&(dr, dc)| {
                let r = row.checked_add_signed(dr)?;
                let c = col.checked_add_signed(dc)?;
                let i = self.index_of(r, c)?;
                self.slots[i].as_ref().map(|_| i)
            })
            .collect()
    }

    /// Slot index containing a local point, if it lies inside the extent.
    /// The slot may be excluded.
    pub fn locate(&self, point: Coord<f64>) -> Option<usize> {
        if !rect_contains(&self.extent, point) {
            return None;
        }
        let min = self.extent.min();
        let row = (((point.y - min.y) / self.cell_size).floor() as usize).min(self.rows - 1);
        let col = (((point.x - min.x) / self.cell_size).floor() as usize).min(self.cols - 1);
        self.index_of(row, col)
    }

    /// Geographic position of a present cell's center.
    pub fn geographic_center(&self, index: usize) -> Option<GeoPoint> {
        self.cell(index).map(|cell| self.frame.to_geographic(cell.center()))
    }

    pub fn total_probability(&self) -> f64 {
        self.cells().map(|(_, c)| c.probability()).sum()
    }

    pub fn max_probability(&self) -> f64 {
        self.cells().map(|(_, c)| c.probability()).fold(0.0, f64::max)
    }

    /// Marks the given cells visited. Indices of excluded or out-of-range
    /// slots are ignored.
    pub fn mark_visited(&mut self, indices: &[usize]) {
        for &i in indices {
            if let Some(Some(cell)) = self.slots.get_mut(i) {
                cell.mark_visited();
            }
        }
    }

    pub fn visited_count(&self) -> usize {
        self.cells().filter(|(_, c)| c.is_visited()).count()
    }

    /// Returns a new snapshot after an observation pass with no detection.
    ///
    /// Every cell whose center lies within `view_radius_m` of `center` has
    /// its probability scaled by `1 - detection_probability`. `self` is left
    /// untouched.
    pub fn observed(&self, center: GeoPoint, view_radius_m: f64, detection_probability: f64) -> PlanResult<CellMap> {
        if !center.is_valid() {
            return Err(PlanError::parameter("center", format!("{:?} is not a valid position", center)));
        }
        if !(view_radius_m.is_finite() && view_radius_m >= 0.0) {
            return Err(PlanError::parameter("view_radius_m", format!("must be >= 0, got {}", view_radius_m)));
        }
        if !(0.0..=1.0).contains(&detection_probability) {
            return Err(PlanError::parameter(
                "detection_probability",
                format!("must be within [0, 1], got {}", detection_probability),
            ));
        }

        let local = self.frame.to_local(center);
        let miss = 1.0 - detection_probability;
        let slots = self
            .slots
            .iter()
            .map(|slot| {
                slot.as_ref().map(|cell| {
                    if planar_distance(cell.center(), local) <= view_radius_m {
                        cell.with_probability(cell.probability() * miss)
                    } else {
                        cell.clone()
                    }
                })
            })
            .collect();

        Ok(Self { slots, ..self.clone_shape() })
    }

    fn clone_shape(&self) -> Self {
        Self {
            rows: self.rows,
            cols: self.cols,
            cell_size: self.cell_size,
            frame: self.frame,
            extent: self.extent,
            slots: Vec::new(),
        }
    }

    /// Bounds a slot would have on an unclipped grid.
    pub(crate) fn slot_bounds(extent: &Rect<f64>, cell_size: f64, row: usize, col: usize) -> Rect<f64> {
        let min = extent.min();
        let x0 = min.x + col as f64 * cell_size;
        let y0 = min.y + row as f64 * cell_size;
        Rect::new(coord! { x: x0, y: y0 }, coord! { x: x0 + cell_size, y: y0 + cell_size })
    }
}

/// Test grid of `size`-meter cells anchored at a fixed origin; `weight`
/// returns `None` for excluded slots.
#[cfg(test)]
pub(crate) fn test_grid(rows: usize, cols: usize, size: f64, weight: impl Fn(usize, usize) -> Option<f64>) -> CellMap {
    let extent = Rect::new(
        coord! { x: 0.0, y: 0.0 },
        coord! { x: cols as f64 * size, y: rows as f64 * size },
    );
    let slots = (0..rows * cols)
        .map(|i| {
            let (r, c) = (i / cols, i % cols);
            weight(r, c).map(|p| Cell::new(CellMap::slot_bounds(&extent, size, r, c), p))
        })
        .collect();
    let frame = LocalFrame::new(GeoPoint::new(38.3144, -76.5452));
    CellMap::from_slots(rows, cols, size, frame, extent, slots).unwrap()
}

/// ASCII mask, north up: `#` present, `*` visited, blank excluded.
impl fmt::Display for CellMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in (0..self.rows).rev() {
            let line: String = (0..self.cols)
                .map(|col| match &self.slots[row * self.cols + col] {
                    None => ' ',
                    Some(cell) if cell.is_visited() => '*',
                    Some(_) => '#',
                })
                .collect();
            writeln!(f, "{}", line.trim_end())?;
        }
        Ok(())
    }
}
