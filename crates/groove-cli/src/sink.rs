//! Audio sink that logs hits instead of playing them

use groove_core::{InstrumentHit, InstrumentRegistry};
use groove_services::{AudioSink, SinkReporter};
use tracing::info;

pub(crate) struct LoggingSink {
    registry: InstrumentRegistry,
    reporter: SinkReporter,
}

impl LoggingSink {
    pub fn new(registry: InstrumentRegistry, reporter: SinkReporter) -> Self {
        Self { registry, reporter }
    }
}

impl AudioSink for LoggingSink {
    fn play_hit(&self, hit: InstrumentHit) {
        let Some((instrument, hit_type)) = self
            .registry
            .get(hit.instrument_id)
            .and_then(|i| i.hit_type(hit.hit_id).map(|h| (i, h)))
        else {
            self.reporter.missing_sample(hit);
            return;
        };
        let Some(sample) = &hit_type.sample else {
            self.reporter.missing_sample(hit);
            return;
        };
        info!(instrument = %instrument.name, key = %hit_type.key, sample = %sample, "hit");
    }
}
