//! Instruments and the hit types they can play

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier for instruments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstrumentId(pub u64);

impl fmt::Display for InstrumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a hit type, unique within its instrument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HitId(pub u64);

/// Reference to one hit type of one instrument.
/// Resolved by the audio layer to a sample, and by the UI to a glyph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstrumentHit {
    pub instrument_id: InstrumentId,
    pub hit_id: HitId,
}

impl InstrumentHit {
    pub fn new(instrument_id: InstrumentId, hit_id: HitId) -> Self {
        Self { instrument_id, hit_id }
    }
}

/// One way of striking an instrument (e.g. open/closed hat)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitType {
    pub id: HitId,
    /// Display glyph, also used to match hits when pasting across instruments
    pub key: String,
    pub name: String,
    /// Sample reference for the audio layer
    #[serde(default)]
    pub sample: Option<String>,
}

impl HitType {
    pub fn new(id: u64, key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: HitId(id),
            key: key.into(),
            name: name.into(),
            sample: None,
        }
    }

    pub fn with_sample(mut self, sample: impl Into<String>) -> Self {
        self.sample = Some(sample.into());
        self
    }
}

/// An instrument with its ordered list of hit types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub id: InstrumentId,
    pub name: String,
    /// Order here is the toggle cycling order
    pub hit_types: Vec<HitType>,
}

impl Instrument {
    pub fn new(id: u64, name: impl Into<String>, hit_types: Vec<HitType>) -> Self {
        Self {
            id: InstrumentId(id),
            name: name.into(),
            hit_types,
        }
    }

    pub fn hit_type(&self, hit_id: HitId) -> Option<&HitType> {
        self.hit_types.iter().find(|h| h.id == hit_id)
    }

    pub fn hit_for_key(&self, key: &str) -> Option<&HitType> {
        self.hit_types.iter().find(|h| h.key == key)
    }

    /// Drop the sample of `hit_id`. Returns true if it had one.
    pub fn clear_sample(&mut self, hit_id: HitId) -> bool {
        self.hit_types
            .iter_mut()
            .find(|h| h.id == hit_id)
            .and_then(|h| h.sample.take())
            .is_some()
    }

    /// Hit that follows `current` in cycling order.
    /// `None` -> first, last -> `None`, unknown -> first.
    pub fn next_hit(&self, current: Option<HitId>) -> Option<InstrumentHit> {
        let next = match current.and_then(|id| self.hit_types.iter().position(|h| h.id == id)) {
            Some(pos) => self.hit_types.get(pos + 1),
            None => self.hit_types.first(),
        };
        next.map(|h| InstrumentHit::new(self.id, h.id))
    }
}
