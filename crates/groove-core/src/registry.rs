//! Registry of instruments known to a file

use serde::{Deserialize, Serialize};

use crate::hit::{HitId, Instrument, InstrumentId};

/// Ordered instrument list. Grid rows follow this order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstrumentRegistry {
    instruments: Vec<Instrument>,
}

impl InstrumentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_instruments(instruments: Vec<Instrument>) -> Self {
        Self { instruments }
    }

    /// Add an instrument, replacing any existing one with the same id in place
    pub fn add(&mut self, instrument: Instrument) {
        match self.instruments.iter_mut().find(|i| i.id == instrument.id) {
            Some(existing) => *existing = instrument,
            None => self.instruments.push(instrument),
        }
    }

    pub fn remove(&mut self, id: InstrumentId) -> Option<Instrument> {
        let pos = self.instruments.iter().position(|i| i.id == id)?;
        Some(self.instruments.remove(pos))
    }

    pub fn get(&self, id: InstrumentId) -> Option<&Instrument> {
        self.instruments.iter().find(|i| i.id == id)
    }

    pub fn get_mut(&mut self, id: InstrumentId) -> Option<&mut Instrument> {
        self.instruments.iter_mut().find(|i| i.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Instrument> {
        self.instruments.iter()
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }

    /// Next free instrument id
    pub fn next_id(&self) -> InstrumentId {
        InstrumentId(self.instruments.iter().map(|i| i.id.0).max().unwrap_or(0) + 1)
    }

    /// Drop the sample behind a hit type. Returns false if there was none.
    pub fn clear_sample(&mut self, instrument_id: InstrumentId, hit_id: HitId) -> bool {
        self.get_mut(instrument_id)
            .is_some_and(|i| i.clear_sample(hit_id))
    }
}
