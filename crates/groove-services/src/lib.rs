//! groove-services: Playback scheduling, storage ports and the editor facade

pub mod audio_sink;
pub mod beat_clock;
pub mod editor;
pub mod events;
pub mod persistence;
pub mod sequence_player;
pub mod ticker;

pub use audio_sink::{AudioSink, RecordingSink, SinkReport, SinkReporter};
pub use beat_clock::{BeatClock, ClockConfig, ClockError, CompleteFn, SectionChangeFn};
pub use editor::GrooveEditor;
pub use events::EditorEvent;
pub use persistence::{JsonDirPersistence, MemoryPersistence, Persistence, PersistenceError};
pub use sequence_player::SequencePlayer;
pub use ticker::{BeatSignal, IntervalTicker, ThreadTicker, TickSource, TickerError, TimingStrategy};
