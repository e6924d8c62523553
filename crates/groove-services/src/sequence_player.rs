//! Plays an ordered list of grids back to back

use std::collections::VecDeque;
use std::time::Instant;

use crossbeam_channel::{unbounded, Receiver, Sender};
use groove_core::{Grid, GridId};
use tracing::{info, warn};

use crate::beat_clock::{BeatClock, ClockError, SectionChangeFn};

/// Owns the single beat clock and advances it through a sequence of grids
pub struct SequencePlayer {
    clock: BeatClock,
    /// Grids still to play after the current one
    queue: VecDeque<GridId>,
    on_section_change: Option<SectionChangeFn>,
    complete_tx: Sender<GridId>,
    complete_rx: Receiver<GridId>,
}

impl SequencePlayer {
    pub fn new(clock: BeatClock) -> Self {
        let (complete_tx, complete_rx) = unbounded();
        Self {
            clock,
            queue: VecDeque::new(),
            on_section_change: None,
            complete_tx,
            complete_rx,
        }
    }

    pub fn clock(&self) -> &BeatClock {
        &self.clock
    }

    /// True while any grid is playing
    pub fn is_playing(&self) -> bool {
        self.clock.is_playing()
    }

    pub fn current_grid(&self) -> Option<GridId> {
        self.clock.grid_id()
    }

    /// Play every grid in `index` order, each for its configured repetitions.
    /// Calling this while playing stops instead. Returns whether playing.
    pub fn play_sequence(
        &mut self,
        grids: &[Grid],
        on_section_change: Option<SectionChangeFn>,
        now: Instant,
    ) -> Result<bool, ClockError> {
        if self.is_playing() {
            self.stop();
            return Ok(false);
        }

        let mut ordered: Vec<&Grid> = grids.iter().collect();
        ordered.sort_by_key(|g| g.index);
        self.queue = ordered.iter().map(|g| g.id).collect();
        self.on_section_change = on_section_change;
        info!(grids = self.queue.len(), "Sequence started");

        self.advance(grids, now)?;
        Ok(self.is_playing())
    }

    /// Play a single grid for `loop_count` loops (0 = forever)
    pub fn play_grid(&mut self, grid: &Grid, loop_count: u32, now: Instant) -> Result<(), ClockError> {
        self.stop();
        self.clock.start(grid, loop_count, Some(self.completion()), None, now)
    }

    /// Stop the current grid and forget the rest of the sequence
    pub fn stop(&mut self) {
        self.queue.clear();
        self.on_section_change = None;
        self.clock.stop();
        while self.complete_rx.try_recv().is_ok() {}
    }

    /// Reschedule the clock after a tempo change on `grid`
    pub fn restart(&mut self, grid: &Grid, now: Instant) -> Result<(), ClockError> {
        self.clock.restart(grid, now)
    }

    /// Run due beats, then move on to the next grid if the current one finished
    pub fn pump(&mut self, grids: &[Grid], now: Instant) -> Result<(), ClockError> {
        self.clock.pump(grids, now);
        while let Ok(finished) = self.complete_rx.try_recv() {
            info!(grid = %finished, remaining = self.queue.len(), "Grid finished");
            if self.is_playing() {
                continue;
            }
            // The next grid picks up on the beat the last one ended on
            let at = self.clock.finished_at().unwrap_or(now);
            self.advance(grids, at)?;
            self.clock.pump(grids, now);
        }
        Ok(())
    }

    fn completion(&self) -> Box<dyn FnOnce(GridId) + Send> {
        let tx = self.complete_tx.clone();
        Box::new(move |id: GridId| {
            let _ = tx.send(id);
        })
    }

    /// Start the next queued grid that still exists
    fn advance(&mut self, grids: &[Grid], now: Instant) -> Result<(), ClockError> {
        while let Some(id) = self.queue.pop_front() {
            let Some(grid) = grids.iter().find(|g| g.id == id) else {
                warn!(grid = %id, "Couldn't find queued grid, skipping");
                continue;
            };
            let on_complete = self.completion();
            self.clock.start(
                grid,
                grid.config.repetitions,
                Some(on_complete),
                self.on_section_change.clone(),
                now,
            )?;
            if self.clock.is_playing() {
                return Ok(());
            }
            // Empty grids complete immediately
            while self.complete_rx.try_recv().is_ok() {}
        }
        self.on_section_change = None;
        info!("Sequence finished");
        Ok(())
    }
}
