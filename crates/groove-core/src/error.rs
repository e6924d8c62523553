//! Error types for groove

use thiserror::Error;

use crate::grid::{CellLocator, GridId};
use crate::hit::InstrumentId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrooveError {
    #[error("Couldn't find grid {0}")]
    GridNotFound(GridId),
    #[error("Couldn't find row {row} in grid {grid}")]
    RowNotFound { grid: GridId, row: usize },
    #[error("Couldn't find cell {0}")]
    CellNotFound(CellLocator),
    #[error("Cell {0} is a continuation slot")]
    ContinuationSlot(CellLocator),
    #[error("Couldn't find a head cell for {0}")]
    NoHeadCell(CellLocator),
    #[error("No cell to merge with on that side of {0}")]
    NoNeighbour(CellLocator),
    #[error("Merge needs exactly one selected cell, got {0}")]
    SelectionSize(usize),
    #[error("Nothing selected")]
    EmptySelection,
    #[error("Couldn't find instrument {0}")]
    InstrumentNotFound(InstrumentId),
}

pub type Result<T> = std::result::Result<T, GrooveError>;
