use crate::{
    PlaybackError, PlaybackPhase, PlaybackSessionManager, PlaybackState, Transition,
    tests::support::{PlaybackCall, PlaybackProbe, recording, wav_payload},
};

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use tokio::time::sleep;

const GRACE: Duration = Duration::from_secs(1);

/// Lets spawned finish watchers run without reaching the grace deadline.
async fn settle() {
    sleep(Duration::from_millis(10)).await;
}

fn manager(probe: &PlaybackProbe) -> PlaybackSessionManager {
    PlaybackSessionManager::new(probe.device(), GRACE).unwrap()
}

/// WHAT: Playing a second recording stops the first before loading
/// WHY: At most one playback may be active at any instant
#[tokio::test(start_paused = true)]
async fn given_recording_playing_when_playing_another_then_first_stopped_before_load() {
    // Given: Recording A is playing
    let probe = PlaybackProbe::default();
    let playback = manager(&probe);
    let a = recording("A", wav_payload(0.1));
    let b = recording("B", wav_payload(0.2));
    playback.play(&a).unwrap();

    // When: Playing recording B
    playback.play(&b).unwrap();

    // Then: B is current and the device stopped A before loading B
    let state = playback.state();
    assert!(state.is_current(b.id));
    assert!(state.is_playing);

    let calls = probe.calls();
    let load_b = calls
        .iter()
        .position(|c| *c == PlaybackCall::Load(b.audio_data.clone()))
        .unwrap();
    let load_a = calls
        .iter()
        .position(|c| *c == PlaybackCall::Load(a.audio_data.clone()))
        .unwrap();
    let stop_between = calls[load_a..load_b].contains(&PlaybackCall::Stop);
    assert!(stop_between, "expected Stop between loads, got {:?}", calls);
}

/// WHAT: stop() twice in a row never errors and leaves playback idle
/// WHY: Stop is idempotent so presentation can call it freely
#[tokio::test(start_paused = true)]
async fn given_playing_when_stopping_twice_then_idle_and_second_stop_ignored() {
    // Given: A recording is playing
    let probe = PlaybackProbe::default();
    let playback = manager(&probe);
    playback.play(&recording("Memo", wav_payload(0.1))).unwrap();

    // When: Stopping twice
    let first = playback.stop();
    let second = playback.stop();

    // Then: First applies, second is a benign no-op, state is idle
    assert_eq!(first, Transition::Applied);
    assert_eq!(second, Transition::Ignored);
    assert_eq!(playback.state(), PlaybackState::default());
}

/// WHAT: stop() with nothing ever played is a benign no-op
/// WHY: Stopping when idle must not be reported as an error
#[tokio::test]
async fn given_idle_when_stopping_then_ignored() {
    // Given: A fresh manager
    let probe = PlaybackProbe::default();
    let playback = manager(&probe);

    // When: Stopping
    let outcome = playback.stop();

    // Then: Ignored and still idle
    assert_eq!(outcome, Transition::Ignored);
    assert_eq!(playback.state().phase(), PlaybackPhase::Idle);
}

/// WHAT: Natural completion keeps the recording current for the grace delay
/// WHY: Presentation shows a "just finished" affordance before clearing
#[tokio::test(start_paused = true)]
async fn given_playing_when_device_finishes_then_cleared_after_grace_delay() {
    // Given: A recording is playing
    let probe = PlaybackProbe::default();
    let playback = manager(&probe);
    let memo = recording("Memo", wav_payload(0.1));
    playback.play(&memo).unwrap();

    // When: The device reports successful completion
    probe.complete();
    settle().await;

    // Then: Not playing but still current during the grace window
    let state = playback.state();
    assert!(!state.is_playing);
    assert!(state.is_current(memo.id));

    // And: Cleared once the grace delay elapses
    sleep(GRACE).await;
    assert_eq!(playback.state(), PlaybackState::default());
}

/// WHAT: A stream that finishes on its own is released before the grace clear
/// WHY: The output device must not stay open once the recording has ended
#[tokio::test(start_paused = true)]
async fn given_playing_when_device_finishes_then_stream_released() {
    // Given: A recording is playing
    let probe = PlaybackProbe::default();
    let playback = manager(&probe);
    assert_eq!(playback.grace_delay(), GRACE);
    playback.play(&recording("Memo", wav_payload(0.1))).unwrap();

    // When: The device reports completion
    probe.complete();
    settle().await;

    // Then: The device was stopped while the recording is still current
    assert_eq!(probe.calls().last(), Some(&PlaybackCall::Stop));
    assert_eq!(playback.state().phase(), PlaybackPhase::Paused);

    // And: After the grace clear there is nothing left to stop
    sleep(GRACE * 2).await;
    assert_eq!(playback.stop(), Transition::Ignored);
    let stops = probe
        .calls()
        .iter()
        .filter(|call| **call == PlaybackCall::Stop)
        .count();
    assert_eq!(stops, 1);
}

/// WHAT: A new play() during the grace window is not clobbered by the delayed clear
/// WHY: The finish callback racing a fresh play is the one real concurrency hazard
#[tokio::test(start_paused = true)]
async fn given_grace_window_when_playing_new_recording_then_delayed_clear_never_fires() {
    // Given: A finished and a fresh recording, inside A's grace window
    let probe = PlaybackProbe::default();
    let playback = manager(&probe);
    let a = recording("A", wav_payload(0.1));
    let b = recording("B", wav_payload(0.1));
    playback.play(&a).unwrap();
    probe.complete();
    settle().await;
    assert!(playback.state().is_current(a.id));

    // When: Playing B, then waiting well past A's grace delay
    playback.play(&b).unwrap();
    sleep(GRACE * 3).await;

    // Then: B is still current and playing
    let state = playback.state();
    assert!(state.is_current(b.id));
    assert!(state.is_playing);
}

/// WHAT: A late finish report from a replaced stream is ignored
/// WHY: Generation tagging keeps stale device callbacks from touching new state
#[tokio::test(start_paused = true)]
async fn given_replaced_stream_when_old_stream_reports_finish_then_state_untouched() {
    // Given: A was replaced by B
    let probe = PlaybackProbe::default();
    let playback = manager(&probe);
    let a = recording("A", wav_payload(0.1));
    let b = recording("B", wav_payload(0.1));
    playback.play(&a).unwrap();
    playback.play(&b).unwrap();

    // When: A's finish signal fires late
    probe.complete_load(0);
    sleep(GRACE * 2).await;

    // Then: B keeps playing
    let state = playback.state();
    assert!(state.is_current(b.id));
    assert!(state.is_playing);
}

/// WHAT: Interrupted completion clears state immediately
/// WHY: Hardware interruptions get no grace delay
#[tokio::test(start_paused = true)]
async fn given_playing_when_device_interrupted_then_cleared_without_grace() {
    // Given: A recording is playing
    let probe = PlaybackProbe::default();
    let playback = manager(&probe);
    playback.play(&recording("Memo", wav_payload(0.1))).unwrap();

    // When: The device reports an interruption
    probe.interrupt("headphones unplugged");
    settle().await;

    // Then: Idle right away
    assert_eq!(playback.state(), PlaybackState::default());
}

/// WHAT: A payload the device rejects fails with DecodeFailed
/// WHY: Corrupt data must be distinguishable from device setup problems
#[tokio::test]
async fn given_undecodable_payload_when_playing_then_decode_failed_and_idle() {
    // Given: A recording whose payload the device cannot decode
    let probe = PlaybackProbe::default();
    let playback = manager(&probe);
    let corrupt = recording("Corrupt", b"BAD payload".to_vec());

    // When: Playing it
    let result = playback.play(&corrupt);

    // Then: DecodeFailed and nothing current or playing
    assert!(matches!(
        result,
        Err(PlaybackError::DecodeFailed { recording_id, .. }) if recording_id == corrupt.id
    ));
    assert_eq!(playback.state(), PlaybackState::default());
}

/// WHAT: An empty payload fails with DecodeFailed before reaching the device
/// WHY: There is nothing to decode, so no device work is attempted
#[tokio::test]
async fn given_empty_payload_when_playing_then_decode_failed_without_load() {
    // Given: A recording with no audio data
    let probe = PlaybackProbe::default();
    let playback = manager(&probe);
    let empty = recording("Empty", Vec::new());

    // When: Playing it
    let result = playback.play(&empty);

    // Then: DecodeFailed and the device never saw a load
    assert!(matches!(result, Err(PlaybackError::DecodeFailed { .. })));
    assert!(
        !probe
            .calls()
            .iter()
            .any(|c| matches!(c, PlaybackCall::Load(_)))
    );
}

/// WHAT: Session configuration failure surfaces as DeviceSetupFailed
/// WHY: Route contention is retryable and must not look like corrupt data
#[tokio::test]
async fn given_session_unavailable_when_playing_then_device_setup_failed() {
    // Given: A device whose session cannot be activated
    let probe = PlaybackProbe::default();
    probe.fail_session(true);
    let playback = manager(&probe);

    // When: Playing a valid recording
    let result = playback.play(&recording("Memo", wav_payload(0.1)));

    // Then: DeviceSetupFailed and idle
    assert!(matches!(result, Err(PlaybackError::DeviceSetupFailed { .. })));
    assert_eq!(playback.state(), PlaybackState::default());

    // And: A retry succeeds once the route frees up
    probe.fail_session(false);
    assert!(playback.play(&recording("Memo", wav_payload(0.1))).is_ok());
}

/// WHAT: Playing a second recording that fails leaves nothing current
/// WHY: Preemption happens before the new load, so failure cannot resurrect A
#[tokio::test]
async fn given_playing_when_next_play_fails_then_previous_not_restored() {
    // Given: Recording A is playing
    let probe = PlaybackProbe::default();
    let playback = manager(&probe);
    playback.play(&recording("A", wav_payload(0.1))).unwrap();

    // When: Playing an undecodable recording
    let result = playback.play(&recording("B", b"BAD".to_vec()));

    // Then: Failure and idle
    assert!(result.is_err());
    assert_eq!(playback.state(), PlaybackState::default());
}

/// WHAT: Pause keeps the recording current; resume continues it
/// WHY: Paused is derived as "current but not playing"
#[tokio::test]
async fn given_playing_when_pausing_and_resuming_then_phase_follows() {
    // Given: A recording is playing
    let probe = PlaybackProbe::default();
    let playback = manager(&probe);
    let memo = recording("Memo", wav_payload(0.1));
    playback.play(&memo).unwrap();

    // When: Pausing
    let paused = playback.pause().unwrap();

    // Then: Paused with the recording still current
    assert_eq!(paused, Transition::Applied);
    let state = playback.state();
    assert!(state.is_paused());
    assert!(state.is_current(memo.id));
    assert_eq!(state.phase(), PlaybackPhase::Paused);

    // When: Resuming
    let resumed = playback.resume().unwrap();

    // Then: Playing again
    assert_eq!(resumed, Transition::Applied);
    assert_eq!(playback.state().phase(), PlaybackPhase::Playing);
    assert!(probe.calls().ends_with(&[PlaybackCall::Pause, PlaybackCall::Resume]));
}

/// WHAT: Pause and resume with nothing loaded are ignored
/// WHY: These are documented benign no-ops, not errors
#[tokio::test]
async fn given_idle_when_pausing_or_resuming_then_ignored() {
    // Given: A fresh manager
    let probe = PlaybackProbe::default();
    let playback = manager(&probe);

    // When / Then: Both are ignored and the device is untouched
    assert_eq!(playback.pause().unwrap(), Transition::Ignored);
    assert_eq!(playback.resume().unwrap(), Transition::Ignored);
    assert!(probe.calls().is_empty());
}

/// WHAT: Resume during the grace window is ignored
/// WHY: The finished stream is no longer loaded
#[tokio::test(start_paused = true)]
async fn given_grace_window_when_resuming_then_ignored() {
    // Given: A recording that just finished
    let probe = PlaybackProbe::default();
    let playback = manager(&probe);
    playback.play(&recording("Memo", wav_payload(0.1))).unwrap();
    probe.complete();
    settle().await;

    // When: Resuming
    let outcome = playback.resume().unwrap();

    // Then: Ignored; still not playing
    assert_eq!(outcome, Transition::Ignored);
    assert!(!playback.state().is_playing);
}

/// WHAT: A device fault on resume returns playback to idle
/// WHY: Failures recover into a clean state instead of a half-paused one
#[tokio::test]
async fn given_paused_when_resume_faults_then_setup_failed_and_idle() {
    // Given: A paused recording on a device that fails to resume
    let probe = PlaybackProbe::default();
    let playback = manager(&probe);
    playback.play(&recording("Memo", wav_payload(0.1))).unwrap();
    assert_eq!(playback.pause().unwrap(), Transition::Applied);
    probe.fail_resume(true);

    // When: Resuming
    let result = playback.resume();

    // Then: DeviceSetupFailed and idle
    assert!(matches!(result, Err(PlaybackError::DeviceSetupFailed { .. })));
    assert_eq!(playback.state(), PlaybackState::default());
}

/// WHAT: Subscribers see each transition until they unsubscribe
/// WHY: Presentation re-renders from notifications, not polling
#[tokio::test(start_paused = true)]
async fn given_subscriber_when_playing_and_finishing_then_each_transition_notified() {
    // Given: A subscriber collecting snapshots
    let probe = PlaybackProbe::default();
    let playback = manager(&probe);
    let seen: Arc<Mutex<Vec<PlaybackState>>> = Arc::default();
    let sink = Arc::clone(&seen);
    let subscription = playback.subscribe(move |state| sink.lock().unwrap().push(state.clone()));
    let memo = recording("Memo", wav_payload(0.1));

    // When: Playing through to completion and the grace clear
    playback.play(&memo).unwrap();
    probe.complete();
    sleep(GRACE * 2).await;

    // Then: Playing -> finished (still current) -> cleared
    let phases: Vec<PlaybackPhase> = seen.lock().unwrap().iter().map(|s| s.phase()).collect();
    assert_eq!(
        phases,
        vec![
            PlaybackPhase::Playing,
            PlaybackPhase::Paused,
            PlaybackPhase::Idle
        ]
    );

    // When: Unsubscribing and playing again
    subscription.unsubscribe();
    playback.play(&memo).unwrap();

    // Then: No further notifications
    assert_eq!(seen.lock().unwrap().len(), 3);
}

/// WHAT: Creating a manager outside a tokio runtime fails cleanly
/// WHY: Finish watchers need a runtime; this must not panic later
#[test]
fn given_no_runtime_when_creating_manager_then_runtime_unavailable() {
    // Given: No tokio runtime on this thread
    let probe = PlaybackProbe::default();

    // When: Creating the manager
    let result = PlaybackSessionManager::new(probe.device(), GRACE);

    // Then: RuntimeUnavailable
    assert!(matches!(
        result,
        Err(PlaybackError::RuntimeUnavailable { .. })
    ));
}
