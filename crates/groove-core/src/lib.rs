//! groove-core: Domain types for the groove step sequencer

mod error;
pub mod grid;
pub mod hit;
pub mod merge;
mod registry;
pub mod selection;
mod transport;

pub use error::{GrooveError, Result};
pub use grid::{CellLocator, Grid, GridCell, GridConfig, GridId, GridRow};
pub use hit::{HitId, HitType, Instrument, InstrumentHit, InstrumentId};
pub use merge::{remap_hits, MergeSide};
pub use registry::InstrumentRegistry;
pub use selection::{CopiedCells, Selection};
pub use transport::{BeatPosition, PlayState};
