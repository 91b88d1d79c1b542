//! Fine grid → coarse grid, keeping an exact mapping back.
//!
//! Coarse slot `(R, C)` aggregates the fine block rows `R*k .. R*k+k` and
//! columns `C*k .. C*k+k`, clipped at the grid edge. A block whose fine
//! slots are all excluded becomes an excluded coarse slot, so every present
//! coarse cell owns at least one fine cell and every present fine cell has
//! exactly one parent.

use geo::{coord, Rect};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cell::Cell;
use crate::cell_map::CellMap;
use crate::error::{PlanError, PlanResult};

/// Combines constituent fine probabilities into one coarse probability.
pub type AggregateFn = fn(&[f64]) -> f64;

pub fn sum_probabilities(values: &[f64]) -> f64 {
    values.iter().sum()
}

pub fn max_probability(values: &[f64]) -> f64 {
    values.iter().copied().fold(0.0, f64::max)
}

/// Index-array partition relating a coarse grid to its fine grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressionMap {
    factor: usize,
    fine_dims: (usize, usize),
    coarse_dims: (usize, usize),
    /// Per fine slot: the coarse slot that owns it
    parents: Vec<Option<usize>>,
    /// Per coarse slot: owned fine slots, ascending
    constituents: Vec<Vec<usize>>,
}

impl CompressionMap {
    pub fn factor(&self) -> usize {
        self.factor
    }

    /// `(rows, cols)` of the fine grid.
    pub fn fine_dims(&self) -> (usize, usize) {
        self.fine_dims
    }

    /// `(rows, cols)` of the coarse grid.
    pub fn coarse_dims(&self) -> (usize, usize) {
        self.coarse_dims
    }

    pub fn parent_of(&self, fine: usize) -> Option<usize> {
        self.parents.get(fine).copied().flatten()
    }

    /// Fine cells owned by a coarse cell; empty for excluded or
    /// out-of-range slots.
    pub fn constituents(&self, coarse: usize) -> &[usize] {
        self.constituents.get(coarse).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Present coarse cells with their constituents, row-major.
    pub fn groups(&self) -> impl Iterator<Item = (usize, &[usize])> + '_ {
        self.constituents
            .iter()
            .enumerate()
            .filter(|(_, members)| !members.is_empty())
            .map(|(i, members)| (i, members.as_slice()))
    }

    /// Number of fine cells covered by the partition.
    pub fn fine_count(&self) -> usize {
        self.parents.iter().filter(|p| p.is_some()).count()
    }

    /// True when this map is a total, disjoint partition of `fine`'s
    /// present cells.
    pub fn is_partition_of(&self, fine: &CellMap) -> bool {
        if self.fine_dims != (fine.rows(), fine.cols()) {
            return false;
        }

        let mut owner: Vec<Option<usize>> = vec![None; fine.slot_count()];
        for (coarse, members) in self.groups() {
            for &m in members {
                match owner.get_mut(m) {
                    Some(slot) if slot.is_none() => *slot = Some(coarse),
                    _ => return false,
                }
            }
        }

        (0..fine.slot_count()).all(|i| {
            let present = fine.cell(i).is_some();
            present == owner[i].is_some() && owner[i] == self.parent_of(i)
        })
    }
}

/// Builds coarse grids from fine ones.
#[derive(Debug, Clone, Copy)]
pub struct Compressor {
    factor: usize,
    aggregate: AggregateFn,
}

impl Compressor {
    /// Compressor with factor `k` and sum aggregation.
    pub fn new(factor: usize) -> PlanResult<Self> {
        if factor == 0 {
            return Err(PlanError::InvalidCompressionFactor(factor));
        }
        Ok(Self {
            factor,
            aggregate: sum_probabilities,
        })
    }

    pub fn with_aggregation(mut self, aggregate: AggregateFn) -> Self {
        self.aggregate = aggregate;
        self
    }

    pub fn factor(&self) -> usize {
        self.factor
    }

    /// Compresses `fine` into a coarse map and the mapping between them.
    ///
    /// Coarse cell bounds are the union of their constituents' bounds, so a
    /// coarse cell clipped by the polygon is centered on the area it
    /// actually covers.
    pub fn compress(&self, fine: &CellMap) -> PlanResult<(CellMap, CompressionMap)> {
        let k = self.factor;
        let (rows, cols) = (fine.rows(), fine.cols());
        let coarse_rows = rows.div_ceil(k);
        let coarse_cols = cols.div_ceil(k);

        let mut parents: Vec<Option<usize>> = vec![None; fine.slot_count()];
        let mut constituents: Vec<Vec<usize>> = Vec::with_capacity(coarse_rows * coarse_cols);
        let mut slots: Vec<Option<Cell>> = Vec::with_capacity(coarse_rows * coarse_cols);

        for cr in 0..coarse_rows {
            for cc in 0..coarse_cols {
                let coarse_index = cr * coarse_cols + cc;
                let mut members = Vec::new();
                for r in (cr * k)..((cr + 1) * k).min(rows) {
                    for c in (cc * k)..((cc + 1) * k).min(cols) {
                        let i = r * cols + c;
                        if fine.cell(i).is_some() {
                            members.push(i);
                        }
                    }
                }

                let slot = self.aggregate_block(fine, &members);
                for &m in &members {
                    parents[m] = Some(coarse_index);
                }
                constituents.push(members);
                slots.push(slot);
            }
        }

        let coarse = CellMap::from_slots(
            coarse_rows,
            coarse_cols,
            fine.cell_size() * k as f64,
            *fine.frame(),
            fine.extent(),
            slots,
        )?;

        debug!(
            factor = k,
            fine_cells = fine.len(),
            coarse_cells = coarse.len(),
            "compressed grid"
        );

        let mapping = CompressionMap {
            factor: k,
            fine_dims: (rows, cols),
            coarse_dims: (coarse_rows, coarse_cols),
            parents,
            constituents,
        };
        Ok((coarse, mapping))
    }

    fn aggregate_block(&self, fine: &CellMap, members: &[usize]) -> Option<Cell> {
        let cells: Vec<&Cell> = members.iter().filter_map(|&m| fine.cell(m)).collect();
        let first = cells.first()?;

        let mut min = first.bounds().min();
        let mut max = first.bounds().max();
        for cell in &cells[1..] {
            let b = cell.bounds();
            min = coord! { x: min.x.min(b.min().x), y: min.y.min(b.min().y) };
            max = coord! { x: max.x.max(b.max().x), y: max.y.max(b.max().y) };
        }

        let probabilities: Vec<f64> = cells.iter().map(|c| c.probability()).collect();
        Some(Cell::new(Rect::new(min, max), (self.aggregate)(&probabilities)))
    }
}
