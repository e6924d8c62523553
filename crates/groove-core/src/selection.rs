//! Cell selection within one row, and the copied cells it produces

use serde::{Deserialize, Serialize};

use crate::error::{GrooveError, Result};
use crate::grid::{CellLocator, Grid, GridCell};
use crate::hit::Instrument;

/// Cells copied out of a row, with the instrument they were played by
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CopiedCells {
    pub source_instrument: Instrument,
    pub cells: Vec<GridCell>,
}

/// A single cell or a contiguous run of cells in one row of one grid
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    anchor: Option<CellLocator>,
    cells: Vec<CellLocator>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select just `locator` and make it the anchor
    pub fn start(&mut self, locator: CellLocator) {
        self.anchor = Some(locator);
        self.cells = vec![locator];
    }

    /// Select the inclusive run between the anchor and `locator`.
    /// Only the cell index of `locator` is used; the anchor's row wins.
    pub fn extend_to(&mut self, locator: CellLocator) {
        let Some(anchor) = self.anchor else {
            self.start(locator);
            return;
        };
        let lo = anchor.cell_index.min(locator.cell_index);
        let hi = anchor.cell_index.max(locator.cell_index);
        self.cells = (lo..=hi).map(|i| anchor.with_cell(i)).collect();
    }

    pub fn clear(&mut self) {
        self.anchor = None;
        self.cells.clear();
    }

    pub fn anchor(&self) -> Option<CellLocator> {
        self.anchor
    }

    pub fn cells(&self) -> &[CellLocator] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// First selected cell in column order
    pub fn first(&self) -> Option<CellLocator> {
        self.cells.first().copied()
    }

    /// The selected cell, if exactly one is selected
    pub fn single(&self) -> Result<CellLocator> {
        match self.cells.as_slice() {
            [only] => Ok(*only),
            [] => Err(GrooveError::EmptySelection),
            many => Err(GrooveError::SelectionSize(many.len())),
        }
    }

    /// Drop the whole selection if any cell no longer exists.
    /// Returns true if the selection was dropped.
    pub fn validate<'a>(&mut self, mut find_grid: impl FnMut(CellLocator) -> Option<&'a Grid>) -> bool {
        let stale = self
            .cells
            .iter()
            .any(|&loc| !find_grid(loc).is_some_and(|g| g.contains(loc)));
        if stale {
            self.clear();
        }
        stale
    }

    /// Snapshot the selected head cells in column order.
    /// Continuation slots are skipped since their head carries the span.
    pub fn copy(&self, grid: &Grid) -> Result<CopiedCells> {
        let first = self.first().ok_or(GrooveError::EmptySelection)?;
        let row = grid.row(first.row_index)?;
        grid.cell(first)?;

        let mut cells = Vec::with_capacity(self.cells.len());
        for &loc in &self.cells {
            let cell = grid.cell(loc)?;
            if cell.is_head() {
                cells.push(cell.clone());
            }
        }

        Ok(CopiedCells {
            source_instrument: row.instrument.clone(),
            cells,
        })
    }
}
