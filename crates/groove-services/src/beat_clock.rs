//! Beat clock: plays one grid at a time at its beat-division cadence

use std::sync::Arc;
use std::time::{Duration, Instant};

use groove_core::{BeatPosition, Grid, GridId, InstrumentHit, PlayState};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::audio_sink::AudioSink;
use crate::ticker::{TickSource, TickerError, TimingStrategy};

#[derive(Debug, Error)]
pub enum ClockError {
    #[error("Ticker error: {0}")]
    Ticker(#[from] TickerError),
}

/// Called once when a grid finishes its loops
pub type CompleteFn = Box<dyn FnOnce(GridId) + Send>;
/// Called with `(grid, section)` whenever the playing section changes
pub type SectionChangeFn = Arc<dyn Fn(GridId, usize) + Send + Sync>;

/// Playback settings shared by every grid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    pub timing: TimingStrategy,
    /// Columns per display section
    pub section_columns: usize,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            timing: TimingStrategy::Interval,
            section_columns: 16,
        }
    }
}

/// A hit waiting for its slot inside a multi-hit cell
#[derive(Debug, Clone, Copy)]
struct ScheduledHit {
    fire_at: Instant,
    hit: InstrumentHit,
}

/// Drives playback of one grid: Idle -> Playing -> Idle
pub struct BeatClock {
    ticker: Box<dyn TickSource>,
    sink: Arc<dyn AudioSink>,
    section_columns: usize,
    state: PlayState,
    grid_id: Option<GridId>,
    /// 0 = loop forever
    loop_count: u32,
    next_column: u64,
    completed_loops: u32,
    current_section: Option<usize>,
    on_complete: Option<CompleteFn>,
    on_section_change: Option<SectionChangeFn>,
    pending_hits: Vec<ScheduledHit>,
    position: Option<BeatPosition>,
    finished_at: Option<Instant>,
}

impl BeatClock {
    pub fn new(config: &ClockConfig, sink: Arc<dyn AudioSink>) -> Self {
        Self::with_ticker(config.timing.ticker(), config.section_columns, sink)
    }

    pub fn with_ticker(ticker: Box<dyn TickSource>, section_columns: usize, sink: Arc<dyn AudioSink>) -> Self {
        Self {
            ticker,
            sink,
            section_columns: section_columns.max(1),
            state: PlayState::Idle,
            grid_id: None,
            loop_count: 0,
            next_column: 0,
            completed_loops: 0,
            current_section: None,
            on_complete: None,
            on_section_change: None,
            pending_hits: Vec::new(),
            position: None,
            finished_at: None,
        }
    }

    pub fn state(&self) -> PlayState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlayState::Playing
    }

    /// Grid currently being played
    pub fn grid_id(&self) -> Option<GridId> {
        self.grid_id
    }

    /// Position of the most recent beat
    pub fn position(&self) -> Option<BeatPosition> {
        self.position
    }

    pub fn completed_loops(&self) -> u32 {
        self.completed_loops
    }

    /// Nominal time of the beat on which the last grid finished
    pub fn finished_at(&self) -> Option<Instant> {
        self.finished_at
    }

    /// Start playing `grid`, firing its first beat at `now` before the
    /// repeating timer is scheduled. Any previous playback is stopped.
    pub fn start(
        &mut self,
        grid: &Grid,
        loop_count: u32,
        on_complete: Option<CompleteFn>,
        on_section_change: Option<SectionChangeFn>,
        now: Instant,
    ) -> Result<(), ClockError> {
        self.stop();
        self.finished_at = None;

        if grid.grid_cols() == 0 {
            warn!(grid = %grid.id, "Grid has no columns, nothing to play");
            self.finished_at = Some(now);
            if let Some(done) = on_complete {
                done(grid.id);
            }
            return Ok(());
        }

        self.state = PlayState::Playing;
        self.grid_id = Some(grid.id);
        self.loop_count = loop_count;
        self.on_complete = on_complete;
        self.on_section_change = on_section_change;
        info!(grid = %grid.id, name = grid.name(), loop_count, bpm = grid.config.bpm, "Playback started");

        self.beat(grid, now);
        if let Err(e) = self.ticker.start(grid.config.beat_division_interval(), now) {
            self.stop();
            return Err(e.into());
        }
        Ok(())
    }

    /// Cancel the timer and every pending hit, and forget the callbacks
    pub fn stop(&mut self) {
        self.ticker.cancel();
        self.pending_hits.clear();
        if self.state == PlayState::Playing {
            debug!(grid = ?self.grid_id, "Playback stopped");
        }
        self.state = PlayState::Idle;
        self.grid_id = None;
        self.loop_count = 0;
        self.next_column = 0;
        self.completed_loops = 0;
        self.current_section = None;
        self.on_complete = None;
        self.on_section_change = None;
        self.position = None;
    }

    /// Reschedule the timer at the grid's current tempo, keeping the cursor
    pub fn restart(&mut self, grid: &Grid, now: Instant) -> Result<(), ClockError> {
        if !self.is_playing() || self.grid_id != Some(grid.id) {
            return Ok(());
        }
        self.ticker.cancel();
        if let Err(e) = self.ticker.start(grid.config.beat_division_interval(), now) {
            self.stop();
            return Err(e.into());
        }
        debug!(grid = %grid.id, bpm = grid.config.bpm, "Clock rescheduled");
        Ok(())
    }

    /// Process every beat and sub-beat hit due by `now`, reading the
    /// playing grid's live state from `grids`.
    pub fn pump(&mut self, grids: &[Grid], now: Instant) {
        if !self.is_playing() {
            return;
        }

        for signal in self.ticker.poll(now) {
            self.fire_pending(signal.at);
            let Some(grid) = self.grid_id.and_then(|id| grids.iter().find(|g| g.id == id)) else {
                warn!(grid = ?self.grid_id, "Couldn't find playing grid, stopping");
                self.stop();
                return;
            };
            self.beat(grid, signal.at);
            if !self.is_playing() {
                return;
            }
        }
        self.fire_pending(now);
    }

    /// Earliest instant at which `pump` has work to do
    pub fn next_wakeup(&self) -> Option<Instant> {
        let next_hit = self.pending_hits.iter().map(|h| h.fire_at).min();
        match (self.ticker.next_deadline(), next_hit) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    fn beat(&mut self, grid: &Grid, at: Instant) {
        let cols = grid.grid_cols();
        if cols == 0 {
            return;
        }

        let first = self.next_column == 0;
        let column = (self.next_column % cols as u64) as usize;
        self.next_column += 1;

        if column == 0 && !first {
            if self.loop_count != 0 && self.completed_loops + 1 >= self.loop_count {
                self.complete(grid.id, at);
                return;
            }
            self.completed_loops += 1;
            debug!(grid = %grid.id, loops = self.completed_loops, "Loop completed");
        }

        let section = column / self.section_columns;
        if self.current_section != Some(section) {
            self.current_section = Some(section);
            if let Some(on_change) = &self.on_section_change {
                on_change(grid.id, section);
            }
        }

        self.position = Some(BeatPosition::at_column(column, self.completed_loops, &grid.config));
        self.dispatch(grid, column, at);
    }

    fn complete(&mut self, grid_id: GridId, at: Instant) {
        let on_complete = self.on_complete.take();
        let loops = self.loop_count;
        self.stop();
        self.finished_at = Some(at);
        info!(grid = %grid_id, loops, "Playback completed");
        if let Some(done) = on_complete {
            done(grid_id);
        }
    }

    /// Play every row's cell at `column`. Multi-hit cells spread their
    /// hits evenly over the cell's full duration.
    fn dispatch(&mut self, grid: &Grid, column: usize, at: Instant) {
        let ms_per_division = grid.ms_per_beat_division();
        for cell in grid.rows.iter().filter_map(|r| r.cells.get(column)) {
            if cell.cells_occupied < 1 || cell.hits.is_empty() {
                continue;
            }
            let count = cell.hits.len();
            let duration_ms = ms_per_division * cell.cells_occupied as f64;
            for (i, &hit) in cell.hits.iter().enumerate() {
                if i == 0 {
                    self.sink.play_hit(hit);
                    continue;
                }
                let Some(fire_at) = Duration::try_from_secs_f64(duration_ms * i as f64 / count as f64 / 1000.0)
                    .ok()
                    .and_then(|delay| at.checked_add(delay))
                else {
                    continue;
                };
                self.pending_hits.push(ScheduledHit { fire_at, hit });
            }
        }
    }

    fn fire_pending(&mut self, until: Instant) {
        if self.pending_hits.is_empty() {
            return;
        }
        self.pending_hits.sort_by_key(|h| h.fire_at);
        let due = self.pending_hits.partition_point(|h| h.fire_at <= until);
        for scheduled in self.pending_hits.drain(..due) {
            self.sink.play_hit(scheduled.hit);
        }
    }
}

impl Drop for BeatClock {
    fn drop(&mut self) {
        self.ticker.cancel();
    }
}
