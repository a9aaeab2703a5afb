//! Text rendering of session state for the terminal.

use std::time::Duration;

use chrono::Local;
use uuid::Uuid;
use voice_memo_core::{
    PlaybackPhase, PlaybackState, Recording, RecordingPhase, RecordingState, SelectionState,
};

/// Status line for the recording session.
pub(crate) fn recording(state: &RecordingState) -> String {
    match state.phase {
        RecordingPhase::Idle => "■ recorder idle".to_string(),
        RecordingPhase::Recording => format!("● recording {}", clock(state.elapsed)),
        RecordingPhase::Paused => format!("‖ recording paused at {}", clock(state.elapsed)),
    }
}

/// Status line for the playback session.
pub(crate) fn playback(state: &PlaybackState) -> String {
    let name = state
        .current_recording
        .as_ref()
        .map(|r| r.display_name())
        .unwrap_or_default();

    match state.phase() {
        PlaybackPhase::Idle => "■ playback idle".to_string(),
        PlaybackPhase::Playing => format!("▶ playing '{}'", name),
        PlaybackPhase::Paused => format!("‖ '{}' halted", name),
    }
}

/// Status line for the selection.
pub(crate) fn selection(state: &SelectionState) -> String {
    match (state.is_selecting, state.selected_id) {
        (false, _) => "select mode off".to_string(),
        (true, None) => "select mode: nothing chosen".to_string(),
        (true, Some(id)) => format!("select mode: {} chosen", short_id(id)),
    }
}

/// One row of the `list` output.
///
/// `position` is the 1-based index accepted by `play`, `delete` and
/// `toggle`.
pub(crate) fn row(
    position: usize,
    recording: &Recording,
    playback: &PlaybackState,
    selection: &SelectionState,
) -> String {
    let marker = if !playback.is_current(recording.id) {
        ' '
    } else if playback.is_playing {
        '▶'
    } else {
        '‖'
    };

    let check = if !selection.is_selecting {
        ""
    } else if selection.selected_id == Some(recording.id) {
        "[x] "
    } else {
        "[ ] "
    };

    let length = recording
        .duration()
        .map(clock)
        .unwrap_or_else(|| "--:--".to_string());

    format!(
        "{:>3}. {} {}{:<24} {}  {}  {}",
        position,
        marker,
        check,
        recording.display_name(),
        length,
        recording
            .created_at
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M"),
        short_id(recording.id)
    )
}

/// `mm:ss`, rounding down.
pub(crate) fn clock(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

fn short_id(id: Uuid) -> String {
    id.simple().to_string()[..8].to_string()
}
