mod playback;
mod recording;
mod selection;

pub use {
    playback::{DEFAULT_GRACE_DELAY, PlaybackPhase, PlaybackSessionManager, PlaybackState},
    recording::{DEFAULT_RECORDING_NAME, RecordingPhase, RecordingSessionManager, RecordingState},
    selection::{SelectionCoordinator, SelectionState},
};

/// Outcome of a state-machine operation that did not fail.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// State changed and subscribers were notified.
    Applied,
    /// The operation does not apply in the current state; nothing changed.
    Ignored,
}
