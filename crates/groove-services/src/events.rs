//! Change and error notifications emitted by the editor

use groove_core::{GridId, InstrumentHit};

/// Something consumers of the editor may want to react to
#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    /// A grid was created or mutated
    GridChanged(GridId),
    GridDeleted(GridId),
    /// Storage failed; in-memory state is still current
    DatabaseError { doing_what: String, error: String },
    /// The audio layer had nothing to play for this hit
    MissingSampleAudio(InstrumentHit),
    /// Playback ended, either stopped or run to completion
    PlaybackStopped,
}
