//! Audio output port used by the beat clock

use std::sync::Mutex;

use crossbeam_channel::{unbounded, Receiver, Sender};
use groove_core::InstrumentHit;

/// Out-of-band problems an audio sink reports back to the editor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkReport {
    /// The hit has no backing sample
    MissingSample(InstrumentHit),
}

/// Plays hits. Fire-and-forget: failures go through a report channel,
/// never back into the beat loop.
pub trait AudioSink: Send + Sync {
    fn play_hit(&self, hit: InstrumentHit);
}

/// Sink that records every hit it is asked to play
#[derive(Debug, Default)]
pub struct RecordingSink {
    played: Mutex<Vec<InstrumentHit>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn played(&self) -> Vec<InstrumentHit> {
        self.played.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut played) = self.played.lock() {
            played.clear();
        }
    }
}

impl AudioSink for RecordingSink {
    fn play_hit(&self, hit: InstrumentHit) {
        if let Ok(mut played) = self.played.lock() {
            played.push(hit);
        }
    }
}

/// Sending half of a report channel, handed to sink implementations
#[derive(Debug, Clone)]
pub struct SinkReporter {
    tx: Sender<SinkReport>,
}

impl SinkReporter {
    pub fn channel() -> (Self, Receiver<SinkReport>) {
        let (tx, rx) = unbounded();
        (Self { tx }, rx)
    }

    pub fn missing_sample(&self, hit: InstrumentHit) {
        let _ = self.tx.send(SinkReport::MissingSample(hit));
    }
}
