//! Timing primitives behind the beat clock.
//!
//! A tick source only says *when* a beat happened. Loop counting, section
//! tracking and hit dispatch stay with the consumer, so both strategies
//! drive the same clock logic.

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, select, tick, Receiver, Sender, TrySendError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum TickerError {
    #[error("Failed to spawn timing thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// A beat reported by a tick source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeatSignal {
    /// Nominal time of the beat
    pub at: Instant,
    /// Beats delivered since the source was started, starting at 1
    pub beat: u64,
}

/// Which tick source the clock uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimingStrategy {
    /// Deadlines checked on the caller's thread
    #[default]
    Interval,
    /// Dedicated timing thread posting beats over a channel
    Thread,
}

impl TimingStrategy {
    pub fn ticker(self) -> Box<dyn TickSource> {
        match self {
            Self::Interval => Box::new(IntervalTicker::new()),
            Self::Thread => Box::new(ThreadTicker::new()),
        }
    }
}

/// Repeating timer the beat clock polls for elapsed beats
pub trait TickSource: Send {
    /// Start ticking every `interval`, first tick one interval after `now`
    fn start(&mut self, interval: Duration, now: Instant) -> Result<(), TickerError>;
    /// Stop ticking and drop any beats not yet polled
    fn cancel(&mut self);
    /// Beats to process up to `now`, oldest first
    fn poll(&mut self, now: Instant) -> Vec<BeatSignal>;
    fn is_running(&self) -> bool;
    /// Next beat time, when the source knows it ahead of time
    fn next_deadline(&self) -> Option<Instant> {
        None
    }
}

/// Cooperative ticker: beats are produced when the owner polls
#[derive(Debug, Default)]
pub struct IntervalTicker {
    interval: Duration,
    next: Option<Instant>,
    beat: u64,
}

impl IntervalTicker {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TickSource for IntervalTicker {
    fn start(&mut self, interval: Duration, now: Instant) -> Result<(), TickerError> {
        self.interval = interval.max(Duration::from_micros(100));
        self.next = Some(now + self.interval);
        self.beat = 0;
        Ok(())
    }

    fn cancel(&mut self) {
        self.next = None;
    }

    /// Reports at most one beat per poll. After a stall the missed beats are
    /// dropped and only the latest due one is reported, so the clock's cursor
    /// advances by a single column.
    fn poll(&mut self, now: Instant) -> Vec<BeatSignal> {
        let Some(next) = self.next.filter(|&t| t <= now) else {
            return Vec::new();
        };
        let behind = now.duration_since(next).as_nanos() / self.interval.as_nanos();
        let latest = next + self.interval * u32::try_from(behind).unwrap_or(u32::MAX);
        if behind > 0 {
            debug!(skipped = behind as u64, "Clock fell behind, dropping missed beats");
        }

        self.beat += 1;
        self.next = Some(latest + self.interval);
        vec![BeatSignal { at: latest, beat: self.beat }]
    }

    fn is_running(&self) -> bool {
        self.next.is_some()
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.next
    }
}

/// Beats the timing thread may queue ahead of the consumer
const BEAT_QUEUE: usize = 8;

struct TimingThread {
    stop_tx: Sender<()>,
    beats: Receiver<BeatSignal>,
    handle: JoinHandle<()>,
}

/// Ticker owning a background thread that only keeps time
#[derive(Default)]
pub struct ThreadTicker {
    thread: Option<TimingThread>,
}

impl ThreadTicker {
    pub fn new() -> Self {
        Self::default()
    }

    fn run(interval: Duration, beat_tx: Sender<BeatSignal>, stop_rx: Receiver<()>) {
        let ticks = tick(interval);
        let mut beat = 0;
        loop {
            select! {
                recv(ticks) -> at => {
                    let Ok(at) = at else { break };
                    // Beats are dropped while the consumer isn't draining the queue
                    match beat_tx.try_send(BeatSignal { at, beat: beat + 1 }) {
                        Ok(()) => beat += 1,
                        Err(TrySendError::Full(_)) => {}
                        Err(TrySendError::Disconnected(_)) => break,
                    }
                }
                recv(stop_rx) -> _ => break,
            }
        }
    }
}

impl TickSource for ThreadTicker {
    fn start(&mut self, interval: Duration, _now: Instant) -> Result<(), TickerError> {
        self.cancel();

        let interval = interval.max(Duration::from_micros(100));
        let (beat_tx, beats) = bounded(BEAT_QUEUE);
        let (stop_tx, stop_rx) = bounded(1);
        let handle = thread::Builder::new()
            .name("groove-beat-clock".into())
            .spawn(move || Self::run(interval, beat_tx, stop_rx))?;

        debug!(?interval, "Timing thread started");
        self.thread = Some(TimingThread { stop_tx, beats, handle });
        Ok(())
    }

    fn cancel(&mut self) {
        let Some(timing) = self.thread.take() else {
            return;
        };
        let _ = timing.stop_tx.send(());
        drop(timing.beats);
        let _ = timing.handle.join();
        debug!("Timing thread stopped");
    }

    fn poll(&mut self, _now: Instant) -> Vec<BeatSignal> {
        self.thread
            .as_ref()
            .map(|t| t.beats.try_iter().collect())
            .unwrap_or_default()
    }

    fn is_running(&self) -> bool {
        self.thread.is_some()
    }
}

impl Drop for ThreadTicker {
    fn drop(&mut self) {
        self.cancel();
    }
}
