//! Hit toggling, merging, unmerging, resizing and pasting of grid cells.
//!
//! Every operation either succeeds or leaves the grid untouched.

use serde::{Deserialize, Serialize};

use crate::error::{GrooveError, Result};
use crate::grid::{CellLocator, Grid, GridCell};
use crate::hit::{Instrument, InstrumentHit};
use crate::registry::InstrumentRegistry;

/// Which neighbour a merge folds in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergeSide {
    Left,
    Right,
}

impl Grid {
    /// Cycle the primary hit of the cell through its instrument's hit types.
    ///
    /// Continuation slots resolve to their head first. The instrument is
    /// taken from `registry` when known there, else from the row snapshot.
    /// Returns the new hit, `None` when the cell is now empty.
    pub fn toggle_hit(
        &mut self,
        locator: CellLocator,
        registry: &InstrumentRegistry,
    ) -> Result<Option<InstrumentHit>> {
        self.cell(locator)?;
        let row = self.row_mut(locator.row_index)?;
        let head = row
            .head_index(locator.cell_index)
            .ok_or(GrooveError::NoHeadCell(locator))?;

        let instrument = registry
            .get(row.instrument.id)
            .unwrap_or(&row.instrument);
        let current = row.cells[head].hits.first().map(|h| h.hit_id);
        let next = instrument.next_hit(current);

        row.cells[head].hits = next.into_iter().collect();
        Ok(next)
    }

    /// Fold the nearest head on `side` into the cell at `locator`.
    ///
    /// The leftmost of the two becomes the head of the combined span, starts
    /// with no hits, and the other becomes a continuation slot.
    /// Returns the locator of the surviving head.
    pub fn merge_cells(&mut self, locator: CellLocator, side: MergeSide) -> Result<CellLocator> {
        let cell = self.cell(locator)?;
        if cell.is_continuation() {
            return Err(GrooveError::ContinuationSlot(locator));
        }

        let row = self.row_mut(locator.row_index)?;
        let index = locator.cell_index;
        let neighbour = match side {
            MergeSide::Left => (0..index).rev().find(|&i| row.cells[i].is_head()),
            MergeSide::Right => (index + 1..row.cells.len()).find(|&i| row.cells[i].is_head()),
        }
        .ok_or(GrooveError::NoNeighbour(locator))?;

        let (head, absorbed) = (index.min(neighbour), index.max(neighbour));
        let absorbed_span = row.cells[absorbed].cells_occupied;
        row.cells[head].cells_occupied += absorbed_span;
        row.cells[head].hits.clear();
        row.cells[absorbed] = GridCell::continuation();

        Ok(locator.with_cell(head))
    }

    /// Split the span containing `locator` back into single cells.
    ///
    /// Every restored cell receives a copy of the head's hits.
    /// Returns false when the span was a single cell (nothing to do).
    pub fn unmerge_cells(&mut self, locator: CellLocator) -> Result<bool> {
        self.cell(locator)?;
        let row = self.row_mut(locator.row_index)?;
        let head = row
            .head_index(locator.cell_index)
            .ok_or(GrooveError::NoHeadCell(locator))?;

        let span = row.cells[head].cells_occupied;
        if span <= 1 {
            return Ok(false);
        }

        let hits = row.cells[head].hits.clone();
        let end = (head + span).min(row.cells.len());
        for cell in &mut row.cells[head..end] {
            cell.cells_occupied = 1;
            cell.hits = hits.clone();
        }
        Ok(true)
    }

    /// Bring every row to `grid_cols` cells.
    ///
    /// Truncation does not renormalize spans crossing the new end, so a head
    /// near the end can claim more slots than remain.
    pub fn resize(&mut self) {
        let cols = self.grid_cols();
        for row in &mut self.rows {
            row.resize(cols);
        }
    }

    /// Write copied cells into the row of `start`, one logical column per cell.
    ///
    /// A copied span of `n` consumes `n` destination slots (clamped at the
    /// row end). Hits are remapped to `target` by key, falling back to the
    /// target's first hit type. Continuations orphaned past the pasted run
    /// become empty cells. Returns the locators of the written heads.
    pub fn paste_cells(
        &mut self,
        cells: &[GridCell],
        start: CellLocator,
        source: &Instrument,
        target: &Instrument,
    ) -> Result<Vec<CellLocator>> {
        if self.cell(start)?.is_continuation() {
            return Err(GrooveError::ContinuationSlot(start));
        }

        let row = self.row_mut(start.row_index)?;
        let len = row.cells.len();
        let mut column = start.cell_index;
        let mut written = Vec::new();

        for copied in cells.iter().filter(|c| c.is_head()) {
            if column >= len {
                break;
            }
            let span = copied.cells_occupied.min(len - column);
            row.cells[column] = GridCell {
                hits: remap_hits(&copied.hits, source, target),
                cells_occupied: span,
            };
            for slot in &mut row.cells[column + 1..column + span] {
                *slot = GridCell::continuation();
            }
            written.push(start.with_cell(column));
            column += span;
        }

        for slot in row.cells[column..].iter_mut().take_while(|c| c.is_continuation()) {
            *slot = GridCell::empty();
        }

        Ok(written)
    }
}

/// Map hits onto `target` by matching hit keys
pub fn remap_hits(
    hits: &[InstrumentHit],
    source: &Instrument,
    target: &Instrument,
) -> Vec<InstrumentHit> {
    let Some(fallback) = target.hit_types.first() else {
        return Vec::new();
    };

    hits.iter()
        .map(|hit| {
            let matched = source
                .hit_type(hit.hit_id)
                .and_then(|h| target.hit_for_key(&h.key))
                .unwrap_or(fallback);
            InstrumentHit::new(target.id, matched.id)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{GridConfig, GridId};
    use crate::hit::{HitId, HitType, InstrumentId};

    fn kick() -> Instrument {
        Instrument::new(1, "Kick", vec![HitType::new(1, "A", "Accent"), HitType::new(2, "B", "Ghost")])
    }

    fn hats() -> Instrument {
        Instrument::new(2, "Hats", vec![HitType::new(10, "X", "Closed"), HitType::new(11, "O", "Open")])
    }

    fn setup() -> (Grid, InstrumentRegistry) {
        let registry = InstrumentRegistry::from_instruments(vec![kick(), hats()]);
        let grid = Grid::new(GridId(1), 0, GridConfig::default(), registry.iter());
        (grid, registry)
    }

    fn at(row: usize, cell: usize) -> CellLocator {
        CellLocator::new(GridId(1), row, cell)
    }

    fn hit(inst: u64, hit: u64) -> InstrumentHit {
        InstrumentHit::new(InstrumentId(inst), HitId(hit))
    }

    #[test]
    fn test_toggle_cycles_through_hits_then_empty() {
        let (mut grid, registry) = setup();
        let seq: Vec<_> = (0..4)
            .map(|_| grid.toggle_hit(at(0, 3), &registry).unwrap())
            .collect();
        assert_eq!(seq, vec![Some(hit(1, 1)), Some(hit(1, 2)), None, Some(hit(1, 1))]);
        assert_eq!(grid.rows[0].cells[3].hits, vec![hit(1, 1)]);
    }

    #[test]
    fn test_toggle_on_continuation_targets_head() {
        let (mut grid, registry) = setup();
        grid.merge_cells(at(0, 4), MergeSide::Right).unwrap();
        grid.toggle_hit(at(0, 5), &registry).unwrap();
        assert_eq!(grid.rows[0].cells[4].hits, vec![hit(1, 1)]);
        assert!(grid.rows[0].cells[5].hits.is_empty());
    }

    #[test]
    fn test_toggle_out_of_range_is_noop() {
        let (mut grid, registry) = setup();
        let before = grid.clone();
        assert!(grid.toggle_hit(at(0, 16), &registry).is_err());
        assert!(grid.toggle_hit(at(9, 0), &registry).is_err());
        assert_eq!(grid, before);
    }

    #[test]
    fn test_merge_right_and_left() {
        let (mut grid, registry) = setup();
        grid.toggle_hit(at(0, 0), &registry).unwrap();
        let head = grid.merge_cells(at(0, 0), MergeSide::Right).unwrap();
        assert_eq!(head, at(0, 0));
        assert_eq!(grid.rows[0].cells[0].cells_occupied, 2);
        assert!(grid.rows[0].cells[0].hits.is_empty());
        assert!(grid.rows[0].cells[1].is_continuation());

        // Merging left from cell 2 skips the continuation at 1
        let head = grid.merge_cells(at(0, 2), MergeSide::Left).unwrap();
        assert_eq!(head, at(0, 0));
        assert_eq!(grid.rows[0].cells[0].cells_occupied, 3);
        assert!(grid.rows[0].cells[2].is_continuation());
        assert!(grid.is_consistent());
    }

    #[test]
    fn test_merge_errors() {
        let (mut grid, _) = setup();
        assert_eq!(
            grid.merge_cells(at(0, 0), MergeSide::Left),
            Err(GrooveError::NoNeighbour(at(0, 0)))
        );
        assert_eq!(
            grid.merge_cells(at(0, 15), MergeSide::Right),
            Err(GrooveError::NoNeighbour(at(0, 15)))
        );
        grid.merge_cells(at(0, 0), MergeSide::Right).unwrap();
        assert_eq!(
            grid.merge_cells(at(0, 1), MergeSide::Right),
            Err(GrooveError::ContinuationSlot(at(0, 1)))
        );
    }

    #[test]
    fn test_merge_unmerge_round_trip_broadcasts_hits() {
        let (mut grid, registry) = setup();
        grid.merge_cells(at(1, 0), MergeSide::Right).unwrap();
        grid.merge_cells(at(1, 0), MergeSide::Right).unwrap();
        assert_eq!(grid.rows[1].cells[0].cells_occupied, 3);

        grid.toggle_hit(at(1, 0), &registry).unwrap();
        assert!(grid.unmerge_cells(at(1, 2)).unwrap());

        for cell in &grid.rows[1].cells[0..3] {
            assert_eq!(cell.cells_occupied, 1);
            assert_eq!(cell.hits, vec![hit(2, 10)]);
        }
        assert!(grid.is_consistent());
    }

    #[test]
    fn test_unmerge_single_cell_is_noop() {
        let (mut grid, _) = setup();
        let before = grid.clone();
        assert!(!grid.unmerge_cells(at(0, 7)).unwrap());
        assert_eq!(grid, before);
    }

    #[test]
    fn test_occupancy_holds_over_edit_sequence() {
        let (mut grid, _) = setup();
        let steps: [(usize, MergeSide); 6] = [
            (3, MergeSide::Right),
            (3, MergeSide::Right),
            (10, MergeSide::Left),
            (0, MergeSide::Right),
            (9, MergeSide::Right),
            (15, MergeSide::Left),
        ];
        for (cell, side) in steps {
            let locator = at(0, cell);
            let Some(head) = grid.rows[0].head_index(cell) else { continue };
            let _ = grid.merge_cells(locator.with_cell(head), side);
            assert!(grid.is_consistent());
        }
        grid.unmerge_cells(at(0, 5)).unwrap();
        assert!(grid.is_consistent());
        grid.config.bars = 2;
        grid.resize();
        assert!(grid.is_consistent());
    }

    #[test]
    fn test_resize_pads_and_truncates() {
        let (mut grid, registry) = setup();
        grid.toggle_hit(at(0, 2), &registry).unwrap();
        grid.config.bars = 2;
        grid.resize();
        assert_eq!(grid.rows[0].cells.len(), 32);
        assert_eq!(grid.rows[0].cells[31], GridCell::empty());

        grid.config.bars = 1;
        grid.config.beat_divisions = 2;
        grid.resize();
        assert_eq!(grid.rows[0].cells.len(), 8);
        assert_eq!(grid.rows[0].cells[2].hits, vec![hit(1, 1)]);
    }

    #[test]
    fn test_resize_keeps_span_crossing_new_end() {
        let (mut grid, _) = setup();
        grid.config.bars = 2;
        grid.resize();
        grid.merge_cells(at(0, 15), MergeSide::Right).unwrap();

        grid.config.bars = 1;
        grid.resize();

        // The head still claims two slots with only one left in the row
        let row = &grid.rows[0];
        assert_eq!(row.cells.len(), 16);
        assert_eq!(row.cells[15].cells_occupied, 2);
        assert_eq!(row.occupancy(), 17);
        assert!(!grid.is_consistent());
    }

    #[test]
    fn test_paste_remaps_by_key() {
        let (mut grid, _) = setup();
        let copied = vec![GridCell::with_hits(vec![hit(2, 11)])];
        let target = Instrument::new(
            3,
            "Perc",
            vec![HitType::new(20, "X", "Closed"), HitType::new(21, "O", "Open")],
        );
        grid.rows[0].instrument = target.clone();

        grid.paste_cells(&copied, at(0, 4), &hats(), &target).unwrap();
        assert_eq!(grid.rows[0].cells[4].hits, vec![hit(3, 21)]);
    }

    #[test]
    fn test_paste_unknown_key_uses_first_hit() {
        let (mut grid, _) = setup();
        let copied = vec![GridCell::with_hits(vec![hit(2, 11)])];
        grid.paste_cells(&copied, at(0, 0), &hats(), &kick()).unwrap();
        assert_eq!(grid.rows[0].cells[0].hits, vec![hit(1, 1)]);
    }

    #[test]
    fn test_paste_spans_consume_columns() {
        let (mut grid, _) = setup();
        let copied = vec![
            GridCell { hits: vec![hit(1, 2)], cells_occupied: 3 },
            GridCell::with_hits(vec![hit(1, 1)]),
        ];
        let written = grid.paste_cells(&copied, at(0, 2), &kick(), &kick()).unwrap();
        assert_eq!(written, vec![at(0, 2), at(0, 5)]);

        let row = &grid.rows[0];
        assert_eq!(row.cells[2].cells_occupied, 3);
        assert!(row.cells[3].is_continuation());
        assert!(row.cells[4].is_continuation());
        assert_eq!(row.cells[5].hits, vec![hit(1, 1)]);
        assert!(grid.is_consistent());
    }

    #[test]
    fn test_paste_clamps_at_row_end_and_heals_orphans() {
        let (mut grid, _) = setup();
        // Existing span 12..16 gets overwritten at its head
        grid.merge_cells(at(0, 12), MergeSide::Right).unwrap();
        grid.merge_cells(at(0, 12), MergeSide::Right).unwrap();
        grid.merge_cells(at(0, 12), MergeSide::Right).unwrap();

        let copied = vec![GridCell::with_hits(vec![hit(1, 1)])];
        grid.paste_cells(&copied, at(0, 12), &kick(), &kick()).unwrap();
        assert_eq!(grid.rows[0].cells[12].cells_occupied, 1);
        assert_eq!(grid.rows[0].cells[13], GridCell::empty());
        assert!(grid.is_consistent());

        let long = vec![GridCell { hits: Vec::new(), cells_occupied: 8 }];
        grid.paste_cells(&long, at(0, 14), &kick(), &kick()).unwrap();
        assert_eq!(grid.rows[0].cells[14].cells_occupied, 2);
        assert!(grid.is_consistent());
    }
}
