//! Grid, rows and cells of a groove

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{GrooveError, Result};
use crate::hit::{Instrument, InstrumentHit, InstrumentId};

/// Unique identifier for grids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridId(pub u64);

impl fmt::Display for GridId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Addresses one cell slot of one row of one grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellLocator {
    pub grid_id: GridId,
    pub row_index: usize,
    pub cell_index: usize,
}

impl CellLocator {
    pub fn new(grid_id: GridId, row_index: usize, cell_index: usize) -> Self {
        Self { grid_id, row_index, cell_index }
    }

    /// Same row, different cell
    pub fn with_cell(self, cell_index: usize) -> Self {
        Self { cell_index, ..self }
    }
}

impl fmt::Display for CellLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.grid_id, self.row_index, self.cell_index)
    }
}

/// Tempo and layout of a grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    pub bpm: f64,
    pub bars: usize,
    pub beats_per_bar: usize,
    pub beat_divisions: usize,
    /// Times the grid plays in a sequence, 0 = forever
    pub repetitions: u32,
    pub name: String,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            bpm: 120.0,
            bars: 1,
            beats_per_bar: 4,
            beat_divisions: 4,
            repetitions: 1,
            name: String::new(),
        }
    }
}

impl GridConfig {
    pub fn grid_cols(&self) -> usize {
        self.bars * self.beats_per_bar * self.beat_divisions
    }

    /// Tempo clamped to at least 1 bpm; zero, negative and NaN read as 1
    fn playable_bpm(&self) -> f64 {
        if self.bpm.is_finite() && self.bpm >= 1.0 {
            self.bpm
        } else {
            1.0
        }
    }

    /// Length of one beat division in milliseconds, always finite and positive
    pub fn ms_per_beat_division(&self) -> f64 {
        60_000.0 / self.playable_bpm() / self.beat_divisions.max(1) as f64
    }

    pub fn beat_division_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.ms_per_beat_division() / 1000.0)
            .unwrap_or(Duration::from_secs(60))
    }

    /// Clamp tempo and layout into playable ranges
    pub fn normalized(mut self) -> Self {
        self.bpm = self.playable_bpm();
        self.bars = self.bars.max(1);
        self.beats_per_bar = self.beats_per_bar.max(1);
        self.beat_divisions = self.beat_divisions.max(1);
        self
    }
}

/// One slot of a row.
///
/// `cells_occupied == 0` marks a continuation slot covered by the nearest
/// preceding head; `cells_occupied == n` marks a head spanning `n` slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridCell {
    pub hits: Vec<InstrumentHit>,
    pub cells_occupied: usize,
}

impl Default for GridCell {
    fn default() -> Self {
        Self::empty()
    }
}

impl GridCell {
    /// Unmerged cell with no hits
    pub fn empty() -> Self {
        Self {
            hits: Vec::new(),
            cells_occupied: 1,
        }
    }

    pub fn continuation() -> Self {
        Self {
            hits: Vec::new(),
            cells_occupied: 0,
        }
    }

    pub fn with_hits(hits: Vec<InstrumentHit>) -> Self {
        Self { hits, cells_occupied: 1 }
    }

    pub fn is_head(&self) -> bool {
        self.cells_occupied > 0
    }

    pub fn is_continuation(&self) -> bool {
        self.cells_occupied == 0
    }
}

/// A row of cells played by one instrument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridRow {
    /// Snapshot of the instrument at the time the row was built
    pub instrument: Instrument,
    pub cells: Vec<GridCell>,
}

impl GridRow {
    pub fn new(instrument: Instrument, cols: usize) -> Self {
        Self {
            instrument,
            cells: vec![GridCell::empty(); cols],
        }
    }

    /// Sum of span sizes over head cells
    pub fn occupancy(&self) -> usize {
        self.cells.iter().map(|c| c.cells_occupied).sum()
    }

    /// Index of the head owning `index`, walking backwards over continuations
    pub fn head_index(&self, index: usize) -> Option<usize> {
        if index >= self.cells.len() {
            return None;
        }
        (0..=index).rev().find(|&i| self.cells[i].is_head())
    }

    /// Resize to `cols` slots, truncating or padding with empty cells.
    /// Spans straddling the new end are left as they are.
    pub fn resize(&mut self, cols: usize) {
        self.cells.resize_with(cols, GridCell::empty);
    }
}

/// A grid of rows played as one unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    pub id: GridId,
    /// Play and display order within the file
    pub index: usize,
    pub config: GridConfig,
    pub rows: Vec<GridRow>,
    #[serde(skip)]
    pub playing: bool,
    #[serde(skip)]
    pub currently_playing_column: Option<usize>,
}

impl Grid {
    /// New grid with one empty row per instrument
    pub fn new<'a>(
        id: GridId,
        index: usize,
        config: GridConfig,
        instruments: impl IntoIterator<Item = &'a Instrument>,
    ) -> Self {
        let config = config.normalized();
        let cols = config.grid_cols();
        Self {
            id,
            index,
            rows: instruments
                .into_iter()
                .map(|i| GridRow::new(i.clone(), cols))
                .collect(),
            config,
            playing: false,
            currently_playing_column: None,
        }
    }

    pub fn grid_cols(&self) -> usize {
        self.config.grid_cols()
    }

    pub fn ms_per_beat_division(&self) -> f64 {
        self.config.ms_per_beat_division()
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn row(&self, row_index: usize) -> Result<&GridRow> {
        self.rows.get(row_index).ok_or(GrooveError::RowNotFound {
            grid: self.id,
            row: row_index,
        })
    }

    pub fn row_mut(&mut self, row_index: usize) -> Result<&mut GridRow> {
        let grid = self.id;
        self.rows
            .get_mut(row_index)
            .ok_or(GrooveError::RowNotFound { grid, row: row_index })
    }

    pub fn cell(&self, locator: CellLocator) -> Result<&GridCell> {
        self.check_grid(locator)?;
        self.row(locator.row_index)?
            .cells
            .get(locator.cell_index)
            .ok_or(GrooveError::CellNotFound(locator))
    }

    pub fn contains(&self, locator: CellLocator) -> bool {
        self.cell(locator).is_ok()
    }

    pub(crate) fn check_grid(&self, locator: CellLocator) -> Result<()> {
        if locator.grid_id != self.id {
            return Err(GrooveError::GridNotFound(locator.grid_id));
        }
        Ok(())
    }

    /// Append an empty row for a newly added instrument
    pub fn add_row(&mut self, instrument: Instrument) {
        let cols = self.grid_cols();
        self.rows.push(GridRow::new(instrument, cols));
    }

    /// Drop rows played by `instrument_id`. Returns the number removed.
    pub fn remove_rows_for(&mut self, instrument_id: InstrumentId) -> usize {
        let before = self.rows.len();
        self.rows.retain(|r| r.instrument.id != instrument_id);
        before - self.rows.len()
    }

    /// Every row's occupancy equals the column count
    pub fn is_consistent(&self) -> bool {
        let cols = self.grid_cols();
        self.rows
            .iter()
            .all(|r| r.cells.len() == cols && r.occupancy() == cols)
    }

    /// Remove every occurrence of `hit` and forget its sample in the row
    /// snapshots. Returns true if anything changed.
    pub fn clear_hit(&mut self, hit: InstrumentHit) -> bool {
        let mut changed = false;
        for row in self.rows.iter_mut().filter(|r| r.instrument.id == hit.instrument_id) {
            changed |= row.instrument.clear_sample(hit.hit_id);
        }
        for cell in self.rows.iter_mut().flat_map(|r| r.cells.iter_mut()) {
            let before = cell.hits.len();
            cell.hits.retain(|h| *h != hit);
            changed |= cell.hits.len() != before;
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hit::HitType;

    fn instruments() -> Vec<Instrument> {
        vec![
            Instrument::new(1, "Kick", vec![HitType::new(1, "X", "Hit")]),
            Instrument::new(2, "Snare", vec![HitType::new(1, "X", "Hit")]),
        ]
    }

    #[test]
    fn test_default_layout() {
        let grid = Grid::new(GridId(1), 0, GridConfig::default(), &instruments());
        assert_eq!(grid.grid_cols(), 16);
        assert_eq!(grid.rows.len(), 2);
        assert!(grid.is_consistent());
        assert_eq!(grid.ms_per_beat_division(), 125.0);
        assert_eq!(grid.config.beat_division_interval(), Duration::from_millis(125));
    }

    #[test]
    fn test_normalized_config() {
        let config = GridConfig {
            bpm: 0.0,
            bars: 0,
            ..Default::default()
        }
        .normalized();
        assert_eq!(config.bpm, 1.0);
        assert_eq!(config.bars, 1);
    }

    #[test]
    fn test_unplayable_tempo_still_has_interval() {
        for bpm in [0.0, -90.0, f64::NAN, f64::INFINITY] {
            let config = GridConfig { bpm, ..Default::default() };
            assert_eq!(config.beat_division_interval(), Duration::from_secs(15));
        }
        let config = GridConfig {
            beat_divisions: 0,
            ..Default::default()
        };
        assert_eq!(config.beat_division_interval(), Duration::from_millis(500));
    }

    #[test]
    fn test_clear_hit_forgets_row_sample() {
        let kick = Instrument::new(1, "Kick", vec![HitType::new(1, "X", "Hit").with_sample("kick.wav")]);
        let mut grid = Grid::new(GridId(1), 0, GridConfig::default(), [&kick]);
        let hit = InstrumentHit::new(InstrumentId(1), crate::hit::HitId(1));
        grid.rows[0].cells[3].hits = vec![hit];

        assert!(grid.clear_hit(hit));
        assert!(grid.rows[0].cells[3].hits.is_empty());
        assert_eq!(grid.rows[0].instrument.hit_types[0].sample, None);
        assert!(!grid.clear_hit(hit));
    }

    #[test]
    fn test_head_index_walks_back() {
        let mut row = GridRow::new(instruments().remove(0), 4);
        row.cells[1].cells_occupied = 3;
        row.cells[2] = GridCell::continuation();
        row.cells[3] = GridCell::continuation();
        assert_eq!(row.head_index(3), Some(1));
        assert_eq!(row.head_index(0), Some(0));
        assert_eq!(row.head_index(4), None);
        assert_eq!(row.occupancy(), 4);
    }

    #[test]
    fn test_rows_follow_instruments() {
        let mut grid = Grid::new(GridId(1), 0, GridConfig::default(), &instruments());
        grid.add_row(Instrument::new(3, "Hat", Vec::new()));
        assert_eq!(grid.rows.len(), 3);
        assert_eq!(grid.rows[2].cells.len(), 16);
        assert_eq!(grid.remove_rows_for(InstrumentId(1)), 1);
        assert_eq!(grid.rows[0].instrument.name, "Snare");
    }

    #[test]
    fn test_cell_lookup_errors() {
        let grid = Grid::new(GridId(1), 0, GridConfig::default(), &instruments());
        assert!(grid.contains(CellLocator::new(GridId(1), 1, 15)));
        assert_eq!(
            grid.cell(CellLocator::new(GridId(1), 1, 16)),
            Err(GrooveError::CellNotFound(CellLocator::new(GridId(1), 1, 16)))
        );
        assert_eq!(
            grid.cell(CellLocator::new(GridId(1), 5, 0)),
            Err(GrooveError::RowNotFound { grid: GridId(1), row: 5 })
        );
        assert_eq!(
            grid.cell(CellLocator::new(GridId(2), 0, 0)),
            Err(GrooveError::GridNotFound(GridId(2)))
        );
    }
}
