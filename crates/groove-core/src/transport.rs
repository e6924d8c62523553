//! Playback state and beat position snapshots

use serde::{Deserialize, Serialize};

use crate::grid::GridConfig;

/// Beat clock state. Pausing is modeled as stopping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlayState {
    #[default]
    Idle,
    Playing,
}

/// Where a beat falls within its grid, for overlays and assertions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BeatPosition {
    /// Completed loops before this beat (0-indexed)
    pub repetition: u32,
    /// Bar within the grid (0-indexed)
    pub bar: usize,
    /// Beat within the bar (0-indexed)
    pub beat: usize,
    /// Division within the beat (0-indexed)
    pub beat_division: usize,
    /// Column within the grid
    pub cell: usize,
    pub grid_cells: usize,
}

impl BeatPosition {
    pub fn at_column(column: usize, repetition: u32, config: &GridConfig) -> Self {
        let divisions = config.beat_divisions.max(1);
        let beats_per_bar = config.beats_per_bar.max(1);
        Self {
            repetition,
            bar: column / (beats_per_bar * divisions),
            beat: (column / divisions) % beats_per_bar,
            beat_division: column % divisions,
            cell: column,
            grid_cells: config.grid_cols(),
        }
    }

    /// Human readable position, 1-indexed like a transport display
    pub fn format(&self) -> String {
        format!(
            "{}.{}.{} ({}/{}) x{}",
            self.bar + 1,
            self.beat + 1,
            self.beat_division + 1,
            self.cell + 1,
            self.grid_cells,
            self.repetition + 1
        )
    }
}
