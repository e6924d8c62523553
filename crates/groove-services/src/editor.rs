//! Editor facade: grids, selection, clipboard, storage and playback

use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::{unbounded, Receiver, Sender};
use groove_core::{
    BeatPosition, CellLocator, CopiedCells, Grid, GridConfig, GridId, GrooveError, Instrument,
    InstrumentHit, InstrumentId, InstrumentRegistry, MergeSide, Result, Selection,
};
use tracing::{debug, info, warn};

use crate::audio_sink::{AudioSink, SinkReport};
use crate::beat_clock::{BeatClock, ClockConfig, ClockError, SectionChangeFn};
use crate::events::EditorEvent;
use crate::persistence::Persistence;
use crate::sequence_player::SequencePlayer;

fn find_mut(grids: &mut [Grid], id: GridId) -> Result<&mut Grid> {
    grids
        .iter_mut()
        .find(|g| g.id == id)
        .ok_or(GrooveError::GridNotFound(id))
}

/// Owns the grids of one file and everything that edits or plays them
pub struct GrooveEditor {
    grids: Vec<Grid>,
    registry: InstrumentRegistry,
    persistence: Box<dyn Persistence>,
    selection: Selection,
    clipboard: Option<CopiedCells>,
    player: SequencePlayer,
    events_tx: Sender<EditorEvent>,
    events_rx: Receiver<EditorEvent>,
    sink_reports: Option<Receiver<SinkReport>>,
    was_playing: bool,
}

impl GrooveEditor {
    pub fn new(
        registry: InstrumentRegistry,
        persistence: Box<dyn Persistence>,
        sink: Arc<dyn AudioSink>,
        config: &ClockConfig,
    ) -> Self {
        Self::with_clock(registry, persistence, BeatClock::new(config, sink))
    }

    pub fn with_clock(
        registry: InstrumentRegistry,
        persistence: Box<dyn Persistence>,
        clock: BeatClock,
    ) -> Self {
        let (events_tx, events_rx) = unbounded();
        Self {
            grids: Vec::new(),
            registry,
            persistence,
            selection: Selection::new(),
            clipboard: None,
            player: SequencePlayer::new(clock),
            events_tx,
            events_rx,
            sink_reports: None,
            was_playing: false,
        }
    }

    /// Listen for reports from the audio sink
    pub fn with_sink_reports(mut self, reports: Receiver<SinkReport>) -> Self {
        self.sink_reports = Some(reports);
        self
    }

    /// Stream of change and error events
    pub fn events(&self) -> Receiver<EditorEvent> {
        self.events_rx.clone()
    }

    pub fn grids(&self) -> &[Grid] {
        &self.grids
    }

    pub fn grid(&self, id: GridId) -> Option<&Grid> {
        self.grids.iter().find(|g| g.id == id)
    }

    pub fn registry(&self) -> &InstrumentRegistry {
        &self.registry
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn clipboard(&self) -> Option<&CopiedCells> {
        self.clipboard.as_ref()
    }

    /// Load instruments and grids from storage, creating a default grid
    /// when the file has none
    pub fn load(&mut self) {
        match self.persistence.all_instruments() {
            Ok(instruments) => {
                for instrument in instruments {
                    self.registry.add(instrument);
                }
            }
            Err(e) => self.database_error("loading instruments", e),
        }

        match self.persistence.all_grids() {
            Ok(mut grids) => {
                for grid in &mut grids {
                    grid.config = std::mem::take(&mut grid.config).normalized();
                }
                grids.sort_by_key(|g| g.index);
                self.grids = grids;
            }
            Err(e) => self.database_error("loading grids", e),
        }
        info!(grids = self.grids.len(), instruments = self.registry.len(), "File loaded");

        if self.grids.is_empty() {
            self.create_grid("");
        }
    }

    /// Append a grid with the default layout and one row per instrument
    pub fn create_grid(&mut self, name: &str) -> GridId {
        let id = GridId(self.grids.iter().map(|g| g.id.0).max().unwrap_or(0) + 1);
        let index = self.grids.iter().map(|g| g.index + 1).max().unwrap_or(0);
        let config = GridConfig {
            name: name.to_string(),
            ..Default::default()
        };
        self.grids.push(Grid::new(id, index, config, self.registry.iter()));
        debug!(grid = %id, index, "Grid created");
        self.save(id, "creating grid");
        id
    }

    pub fn delete_grid(&mut self, id: GridId) -> Result<()> {
        let pos = self
            .grids
            .iter()
            .position(|g| g.id == id)
            .ok_or(GrooveError::GridNotFound(id))?;

        if self.player.current_grid() == Some(id) {
            self.stop();
        }
        self.grids.remove(pos);
        if let Err(e) = self.persistence.delete_grid(id) {
            self.database_error("deleting grid", e);
        }
        self.revalidate_selection();
        self.emit(EditorEvent::GridDeleted(id));
        Ok(())
    }

    /// Replace a grid's config, resizing rows and rescheduling playback
    pub fn set_grid_config(&mut self, id: GridId, config: GridConfig, now: Instant) -> Result<()> {
        let grid = find_mut(&mut self.grids, id)?;
        grid.config = config.normalized();
        grid.resize();

        if self.player.current_grid() == Some(id) {
            if let Err(e) = self.player.restart(grid, now) {
                warn!(grid = %id, error = %e, "Couldn't reschedule playback");
            }
        }
        self.revalidate_selection();
        self.save(id, "updating grid config");
        Ok(())
    }

    /// Register an instrument and give every grid a row for it
    pub fn add_instrument(&mut self, instrument: Instrument) {
        let known = self.registry.get(instrument.id).is_some();
        self.registry.add(instrument.clone());
        if let Err(e) = self.persistence.save_instrument(&instrument) {
            self.database_error("saving instrument", e);
        }

        let ids: Vec<GridId> = self.grids.iter().map(|g| g.id).collect();
        for grid in &mut self.grids {
            if known {
                for row in grid.rows.iter_mut().filter(|r| r.instrument.id == instrument.id) {
                    row.instrument = instrument.clone();
                }
            } else {
                grid.add_row(instrument.clone());
            }
        }
        for id in ids {
            self.save(id, "adding instrument");
        }
    }

    /// Forget an instrument and drop its row from every grid
    pub fn remove_instrument(&mut self, id: InstrumentId) -> Result<Instrument> {
        let removed = self
            .registry
            .remove(id)
            .ok_or(GrooveError::InstrumentNotFound(id))?;

        // Rows below the removed one shift up, so a selection at or below it
        // would land on another instrument
        if let Some(anchor) = self.selection.anchor() {
            let shifted = self
                .grid(anchor.grid_id)
                .and_then(|g| g.rows.iter().position(|r| r.instrument.id == id))
                .is_some_and(|row| row <= anchor.row_index);
            if shifted {
                debug!(instrument = %id, "Selection cleared after row removal");
                self.selection.clear();
            }
        }

        let touched: Vec<GridId> = self
            .grids
            .iter_mut()
            .filter_map(|g| (g.remove_rows_for(id) > 0).then_some(g.id))
            .collect();
        self.revalidate_selection();
        for grid_id in touched {
            self.save(grid_id, "removing instrument");
        }
        Ok(removed)
    }

    pub fn toggle_hit(&mut self, locator: CellLocator) -> Result<Option<InstrumentHit>> {
        let grid = find_mut(&mut self.grids, locator.grid_id)?;
        let hit = grid
            .toggle_hit(locator, &self.registry)
            .inspect_err(|e| warn!(error = %e, "Couldn't toggle hit"))?;
        self.save(locator.grid_id, "toggling hit");
        Ok(hit)
    }

    pub fn select(&mut self, locator: CellLocator) {
        self.selection.start(locator);
    }

    pub fn extend_selection(&mut self, locator: CellLocator) {
        self.selection.extend_to(locator);
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Merge the single selected cell with its neighbour on `side`.
    /// The selection moves to the surviving head.
    pub fn merge_selected(&mut self, side: MergeSide) -> Result<CellLocator> {
        let locator = self
            .selection
            .single()
            .inspect_err(|e| warn!(error = %e, "Couldn't merge"))?;
        let grid = find_mut(&mut self.grids, locator.grid_id)?;
        let head = grid
            .merge_cells(locator, side)
            .inspect_err(|e| warn!(error = %e, "Couldn't merge"))?;

        self.selection.start(head);
        self.save(locator.grid_id, "merging cells");
        Ok(head)
    }

    /// Split the span containing `locator`. Returns false if it was a single cell.
    pub fn unmerge(&mut self, locator: CellLocator) -> Result<bool> {
        let grid = find_mut(&mut self.grids, locator.grid_id)?;
        let split = grid
            .unmerge_cells(locator)
            .inspect_err(|e| warn!(error = %e, "Couldn't unmerge"))?;
        if !split {
            debug!(cell = %locator, "Cell is not merged, nothing to unmerge");
            return Ok(false);
        }
        self.save(locator.grid_id, "unmerging cells");
        Ok(true)
    }

    /// Copy the selected cells. Returns the number of cells copied.
    pub fn copy(&mut self) -> Result<usize> {
        let first = self.selection.first().ok_or(GrooveError::EmptySelection)?;
        let grid = self
            .grid(first.grid_id)
            .ok_or(GrooveError::GridNotFound(first.grid_id))?;
        let copied = self.selection.copy(grid)?;
        let count = copied.cells.len();
        self.clipboard = Some(copied);
        Ok(count)
    }

    /// Paste the clipboard starting at the first selected cell
    pub fn paste(&mut self) -> Result<Vec<CellLocator>> {
        let start = self.selection.first().ok_or(GrooveError::EmptySelection)?;
        let Some(copied) = &self.clipboard else {
            return Ok(Vec::new());
        };

        let grid = find_mut(&mut self.grids, start.grid_id)?;
        let target = grid.row(start.row_index)?.instrument.id;
        let target = self
            .registry
            .get(target)
            .cloned()
            .unwrap_or_else(|| grid.rows[start.row_index].instrument.clone());

        let written = grid
            .paste_cells(&copied.cells, start, &copied.source_instrument, &target)
            .inspect_err(|e| warn!(error = %e, "Couldn't paste"))?;
        self.revalidate_selection();
        self.save(start.grid_id, "pasting cells");
        Ok(written)
    }

    /// Play every grid in order. Toggles playback off when already playing.
    pub fn play_sequence(
        &mut self,
        on_section_change: Option<SectionChangeFn>,
        now: Instant,
    ) -> std::result::Result<bool, ClockError> {
        let playing = self.player.play_sequence(&self.grids, on_section_change, now)?;
        self.sync_play_state();
        Ok(playing)
    }

    /// Loop a single grid until stopped
    pub fn play_grid(&mut self, id: GridId, now: Instant) -> std::result::Result<bool, ClockError> {
        let Some(grid) = self.grids.iter().find(|g| g.id == id) else {
            warn!(grid = %id, "Couldn't find grid to play");
            return Ok(false);
        };
        self.player.play_grid(grid, 0, now)?;
        self.sync_play_state();
        Ok(self.player.is_playing())
    }

    pub fn stop(&mut self) {
        self.player.stop();
        self.sync_play_state();
    }

    pub fn is_playing(&self) -> bool {
        self.player.is_playing()
    }

    pub fn position(&self) -> Option<BeatPosition> {
        self.player.clock().position()
    }

    pub fn next_wakeup(&self) -> Option<Instant> {
        self.player.clock().next_wakeup()
    }

    /// Handle sink reports and run playback up to `now`
    pub fn pump(&mut self, now: Instant) -> std::result::Result<(), ClockError> {
        self.handle_sink_reports();
        let result = self.player.pump(&self.grids, now);
        self.sync_play_state();
        result
    }

    fn handle_sink_reports(&mut self) {
        let Some(reports) = &self.sink_reports else {
            return;
        };
        let reports: Vec<SinkReport> = reports.try_iter().collect();
        for report in reports {
            let SinkReport::MissingSample(hit) = report;
            warn!(instrument = %hit.instrument_id, hit = hit.hit_id.0, "Missing sample audio");
            if self.registry.clear_sample(hit.instrument_id, hit.hit_id) {
                if let Some(instrument) = self.registry.get(hit.instrument_id) {
                    if let Err(e) = self.persistence.save_instrument(instrument) {
                        self.database_error("clearing missing sample", e);
                    }
                }
            }
            self.emit(EditorEvent::MissingSampleAudio(hit));

            let touched: Vec<GridId> = self
                .grids
                .iter_mut()
                .filter_map(|g| g.clear_hit(hit).then_some(g.id))
                .collect();
            for id in touched {
                self.save(id, "clearing missing sample");
            }
        }
    }

    /// Mirror the clock onto the grids' transient play fields
    fn sync_play_state(&mut self) {
        let playing = self.player.current_grid();
        let column = self.player.clock().position().map(|p| p.cell);
        for grid in &mut self.grids {
            let is_current = playing == Some(grid.id);
            grid.playing = is_current;
            grid.currently_playing_column = if is_current { column } else { None };
        }

        let is_playing = self.player.is_playing();
        if self.was_playing && !is_playing {
            self.emit(EditorEvent::PlaybackStopped);
        }
        self.was_playing = is_playing;
    }

    fn revalidate_selection(&mut self) {
        let grids = &self.grids;
        if self
            .selection
            .validate(|loc| grids.iter().find(|g| g.id == loc.grid_id))
        {
            debug!("Selection dropped after grid change");
        }
    }

    fn save(&mut self, id: GridId, doing_what: &str) {
        let Some(grid) = self.grids.iter().find(|g| g.id == id) else {
            return;
        };
        if let Err(e) = self.persistence.save_grid(grid) {
            self.database_error(doing_what, e);
        }
        self.emit(EditorEvent::GridChanged(id));
    }

    fn database_error(&self, doing_what: &str, error: impl std::fmt::Display) {
        warn!(doing_what, error = %error, "Database error");
        self.emit(EditorEvent::DatabaseError {
            doing_what: doing_what.to_string(),
            error: error.to_string(),
        });
    }

    fn emit(&self, event: EditorEvent) {
        let _ = self.events_tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use groove_core::{GridCell, HitId, HitType};

    use crate::audio_sink::{RecordingSink, SinkReporter};
    use crate::persistence::{MemoryPersistence, PersistenceError};
    use crate::ticker::IntervalTicker;

    const STEP: Duration = Duration::from_millis(125);

    fn drums() -> InstrumentRegistry {
        InstrumentRegistry::from_instruments(vec![
            Instrument::new(1, "Kick", vec![HitType::new(1, "X", "Hit"), HitType::new(2, "O", "Ghost")]),
            Instrument::new(2, "Hats", vec![HitType::new(1, "X", "Closed"), HitType::new(2, "O", "Open")]),
        ])
    }

    fn editor_with(persistence: Box<dyn Persistence>) -> (GrooveEditor, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::new());
        let clock = BeatClock::with_ticker(Box::new(IntervalTicker::new()), 4, sink.clone());
        let mut editor = GrooveEditor::with_clock(drums(), persistence, clock);
        editor.load();
        (editor, sink)
    }

    fn editor() -> (GrooveEditor, Arc<RecordingSink>) {
        editor_with(Box::new(MemoryPersistence::new()))
    }

    fn at(row: usize, cell: usize) -> CellLocator {
        CellLocator::new(GridId(1), row, cell)
    }

    fn hit(inst: u64, hit: u64) -> InstrumentHit {
        InstrumentHit::new(InstrumentId(inst), HitId(hit))
    }

    /// Store whose writes always fail
    struct BrokenStore;

    impl Persistence for BrokenStore {
        fn save_grid(&mut self, _: &Grid) -> std::result::Result<(), PersistenceError> {
            Err(std::io::Error::other("disk full").into())
        }
        fn load_grid(&self, _: GridId) -> std::result::Result<Option<Grid>, PersistenceError> {
            Ok(None)
        }
        fn delete_grid(&mut self, _: GridId) -> std::result::Result<(), PersistenceError> {
            Ok(())
        }
        fn all_grids(&self) -> std::result::Result<Vec<Grid>, PersistenceError> {
            Ok(Vec::new())
        }
        fn save_instrument(&mut self, _: &Instrument) -> std::result::Result<(), PersistenceError> {
            Ok(())
        }
        fn all_instruments(&self) -> std::result::Result<Vec<Instrument>, PersistenceError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_load_creates_default_grid() {
        let (editor, _) = editor();
        assert_eq!(editor.grids().len(), 1);
        let grid = &editor.grids()[0];
        assert_eq!(grid.grid_cols(), 16);
        assert_eq!(grid.rows.len(), 2);
        assert_eq!(grid.index, 0);
    }

    #[test]
    fn test_edits_are_saved_and_announced() {
        let (mut editor, _) = editor();
        let events = editor.events();
        while events.try_recv().is_ok() {}

        assert_eq!(editor.toggle_hit(at(0, 0)).unwrap(), Some(hit(1, 1)));
        assert_eq!(events.try_recv(), Ok(EditorEvent::GridChanged(GridId(1))));

        assert!(editor.toggle_hit(at(0, 99)).is_err());
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_persistence_failure_becomes_event() {
        let (mut editor, _) = editor_with(Box::new(BrokenStore));
        let events = editor.events();
        while events.try_recv().is_ok() {}

        assert!(editor.toggle_hit(at(1, 2)).is_ok());
        assert_eq!(editor.grids()[0].rows[1].cells[2].hits, vec![hit(2, 1)]);
        let event = events.try_recv().unwrap();
        assert!(matches!(event, EditorEvent::DatabaseError { ref doing_what, .. } if doing_what == "toggling hit"));
    }

    #[test]
    fn test_merge_requires_single_selection() {
        let (mut editor, _) = editor();
        editor.select(at(0, 2));
        editor.extend_selection(at(0, 3));
        assert_eq!(editor.merge_selected(MergeSide::Right), Err(GrooveError::SelectionSize(2)));

        editor.select(at(0, 3));
        let head = editor.merge_selected(MergeSide::Left).unwrap();
        assert_eq!(head, at(0, 2));
        assert_eq!(editor.selection().cells(), &[at(0, 2)]);
        assert_eq!(editor.grids()[0].rows[0].cells[2].cells_occupied, 2);

        assert!(editor.unmerge(at(0, 3)).unwrap());
        assert!(!editor.unmerge(at(0, 3)).unwrap());
    }

    #[test]
    fn test_copy_paste_across_instruments() {
        let (mut editor, _) = editor();
        // Hats "O" on cell 0
        editor.toggle_hit(at(1, 0)).unwrap();
        editor.toggle_hit(at(1, 0)).unwrap();
        editor.select(at(1, 0));
        editor.extend_selection(at(1, 1));
        assert_eq!(editor.copy().unwrap(), 2);

        editor.select(at(0, 8));
        let written = editor.paste().unwrap();
        assert_eq!(written, vec![at(0, 8), at(0, 9)]);
        assert_eq!(editor.grids()[0].rows[0].cells[8].hits, vec![hit(1, 2)]);
        assert!(editor.grids()[0].rows[0].cells[9].hits.is_empty());
    }

    #[test]
    fn test_shrinking_grid_drops_stale_selection() {
        let (mut editor, _) = editor();
        editor.select(at(0, 12));
        let config = GridConfig {
            beats_per_bar: 2,
            ..editor.grids()[0].config.clone()
        };
        editor.set_grid_config(GridId(1), config, Instant::now()).unwrap();
        assert_eq!(editor.grids()[0].rows[0].cells.len(), 8);
        assert!(editor.selection().is_empty());
    }

    #[test]
    fn test_instruments_and_rows_in_lock_step() {
        let (mut editor, _) = editor();
        let second = editor.create_grid("B");
        editor.add_instrument(Instrument::new(3, "Clap", vec![HitType::new(1, "X", "Clap")]));
        for grid in editor.grids() {
            assert_eq!(grid.rows.len(), 3);
            assert_eq!(grid.rows[2].instrument.name, "Clap");
        }

        editor.remove_instrument(InstrumentId(1)).unwrap();
        assert_eq!(editor.grid(second).unwrap().rows.len(), 2);
        assert_eq!(editor.grid(second).unwrap().index, 1);
        assert_eq!(
            editor.remove_instrument(InstrumentId(1)),
            Err(GrooveError::InstrumentNotFound(InstrumentId(1)))
        );
    }

    #[test]
    fn test_removing_instrument_above_selection_clears_it() {
        let (mut editor, _) = editor();
        editor.toggle_hit(at(0, 0)).unwrap();
        editor.select(at(0, 0));
        editor.copy().unwrap();

        editor.select(at(1, 4));
        editor.remove_instrument(InstrumentId(1)).unwrap();
        assert!(editor.selection().is_empty());
        assert_eq!(editor.paste(), Err(GrooveError::EmptySelection));
        assert!(editor.grids()[0].rows[0].cells[4].hits.is_empty());
    }

    #[test]
    fn test_removing_instrument_below_selection_keeps_it() {
        let (mut editor, _) = editor();
        editor.select(at(0, 4));
        editor.remove_instrument(InstrumentId(2)).unwrap();
        assert_eq!(editor.selection().cells(), &[at(0, 4)]);
    }

    #[test]
    fn test_loaded_grid_with_zero_tempo_plays() {
        let mut store = MemoryPersistence::new();
        let mut grid = Grid::new(GridId(1), 0, GridConfig::default(), drums().iter());
        grid.config.bpm = 0.0;
        grid.rows[0].cells[0].hits = vec![hit(1, 1)];
        store.save_grid(&grid).unwrap();

        let (mut editor, sink) = editor_with(Box::new(store));
        assert_eq!(editor.grids()[0].config.bpm, 1.0);

        let t0 = Instant::now();
        assert!(editor.play_sequence(None, t0).unwrap());
        assert_eq!(sink.played(), vec![hit(1, 1)]);
        assert_eq!(editor.next_wakeup(), Some(t0 + Duration::from_secs(15)));
    }

    #[test]
    fn test_playback_follows_live_edits_and_flags_grid() {
        let (mut editor, sink) = editor();
        let t0 = Instant::now();
        assert!(editor.play_grid(GridId(1), t0).unwrap());
        assert!(editor.grids()[0].playing);

        editor.toggle_hit(at(0, 1)).unwrap();
        editor.pump(t0 + STEP).unwrap();
        assert_eq!(sink.played(), vec![hit(1, 1)]);
        assert_eq!(editor.grids()[0].currently_playing_column, Some(1));

        let events = editor.events();
        while events.try_recv().is_ok() {}
        editor.stop();
        assert!(!editor.grids()[0].playing);
        assert_eq!(events.try_recv(), Ok(EditorEvent::PlaybackStopped));
    }

    #[test]
    fn test_tempo_change_reschedules_without_reset() {
        let (mut editor, _) = editor();
        let t0 = Instant::now();
        editor.play_grid(GridId(1), t0).unwrap();
        editor.pump(t0 + STEP).unwrap();
        editor.pump(t0 + STEP * 2).unwrap();

        let t1 = t0 + STEP * 2;
        let config = GridConfig {
            bpm: 60.0,
            ..editor.grids()[0].config.clone()
        };
        editor.set_grid_config(GridId(1), config, t1).unwrap();
        editor.pump(t1 + STEP).unwrap();
        assert_eq!(editor.position().map(|p| p.cell), Some(2));
        editor.pump(t1 + STEP * 2).unwrap();
        assert_eq!(editor.position().map(|p| p.cell), Some(3));
    }

    #[test]
    fn test_missing_sample_clears_hit() {
        let (reporter, reports) = SinkReporter::channel();
        let (editor, _) = editor();
        let mut editor = editor.with_sink_reports(reports);
        editor.add_instrument(Instrument::new(
            1,
            "Kick",
            vec![HitType::new(1, "X", "Hit").with_sample("kick.wav"), HitType::new(2, "O", "Ghost")],
        ));
        assert!(editor.grids()[0].rows[0].instrument.hit_types[0].sample.is_some());
        editor.toggle_hit(at(0, 4)).unwrap();
        let events = editor.events();
        while events.try_recv().is_ok() {}

        reporter.missing_sample(hit(1, 1));
        editor.pump(Instant::now()).unwrap();

        assert_eq!(events.try_recv(), Ok(EditorEvent::MissingSampleAudio(hit(1, 1))));
        assert_eq!(editor.grids()[0].rows[0].cells[4], GridCell::empty());
        assert_eq!(editor.registry().get(InstrumentId(1)).unwrap().hit_types[0].sample, None);
        assert_eq!(editor.grids()[0].rows[0].instrument.hit_types[0].sample, None);
        // Next toggle starts from empty again
        assert_eq!(editor.toggle_hit(at(0, 4)).unwrap(), Some(hit(1, 1)));
    }

    #[test]
    fn test_delete_playing_grid_stops() {
        let (mut editor, _) = editor();
        let t0 = Instant::now();
        editor.play_sequence(None, t0).unwrap();
        editor.delete_grid(GridId(1)).unwrap();
        assert!(!editor.is_playing());
        assert!(editor.grids().is_empty());
        assert_eq!(editor.delete_grid(GridId(1)), Err(GrooveError::GridNotFound(GridId(1))));
    }
}
