use crate::{
    DeviceFault, PlaybackError, PlaybackResult, Recording, RecordingSummary,
    audio::{FinishSignal, PlaybackDevice, PlaybackEnd},
    observers::{Observers, Subscription},
    session::Transition,
    sync::lock,
};

use std::{
    panic::Location,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use error_location::ErrorLocation;
use tokio::{runtime::Handle, sync::oneshot, task::JoinHandle};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// How long a naturally finished recording stays current before clearing.
pub const DEFAULT_GRACE_DELAY: Duration = Duration::from_secs(1);

/// What, if anything, is playing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlaybackState {
    /// Recording loaded on the device, if any.
    pub current_recording: Option<RecordingSummary>,
    /// Whether audio is coming out right now.
    pub is_playing: bool,
}

impl PlaybackState {
    /// A recording is current but not playing.
    pub fn is_paused(&self) -> bool {
        self.current_recording.is_some() && !self.is_playing
    }

    /// Whether `id` is the current recording.
    pub fn is_current(&self, id: Uuid) -> bool {
        self.current_recording.as_ref().is_some_and(|r| r.id == id)
    }

    /// Coarse phase for presentation.
    pub fn phase(&self) -> PlaybackPhase {
        match (&self.current_recording, self.is_playing) {
            (None, _) => PlaybackPhase::Idle,
            (Some(_), true) => PlaybackPhase::Playing,
            (Some(_), false) => PlaybackPhase::Paused,
        }
    }
}

/// Phase derived from [`PlaybackState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackPhase {
    /// Nothing current.
    Idle,
    /// Current and playing.
    Playing,
    /// Current but halted (paused, or just finished).
    Paused,
}

struct Inner {
    device: Box<dyn PlaybackDevice>,
    state: PlaybackState,
    /// Bumped whenever the loaded stream is replaced or torn down. Finish
    /// reports and grace clears carry the generation they belong to and
    /// are dropped once it is stale.
    generation: u64,
    /// A stream is loaded on the device (false during the grace window).
    loaded: bool,
    pending_clear: Option<JoinHandle<()>>,
}

impl Inner {
    fn invalidate(&mut self) -> u64 {
        self.generation = self.generation.wrapping_add(1);
        if let Some(task) = self.pending_clear.take() {
            task.abort();
            debug!("Pending clear cancelled");
        }
        self.generation
    }

    fn unload(&mut self) {
        if self.loaded {
            self.device.stop();
            self.loaded = false;
        }
    }
}

struct Shared {
    inner: Mutex<Inner>,
    observers: Observers<PlaybackState>,
    grace_delay: Duration,
}

impl Shared {
    /// Releases the lock, then notifies subscribers with the new state.
    fn commit(&self, inner: MutexGuard<'_, Inner>) {
        let snapshot = inner.state.clone();
        drop(inner);
        self.observers.notify(&snapshot);
    }

    fn on_finished(self: &Arc<Self>, runtime: &Handle, generation: u64, end: PlaybackEnd) {
        let mut inner = lock(&self.inner);
        if inner.generation != generation {
            debug!(
                generation,
                current = inner.generation,
                "Ignoring finish from superseded playback"
            );
            return;
        }

        inner.loaded = false;
        inner.device.stop();
        match end {
            PlaybackEnd::Completed => {
                info!(generation, "Playback finished");
                inner.state.is_playing = false;

                let shared = Arc::clone(self);
                let delay = self.grace_delay;
                inner.pending_clear = Some(runtime.spawn(async move {
                    tokio::time::sleep(delay).await;
                    shared.clear_after_grace(generation);
                }));
            }
            PlaybackEnd::Interrupted { reason } => {
                warn!(generation, reason = %reason, "Playback interrupted");
                inner.state = PlaybackState::default();
            }
        }

        self.commit(inner);
    }

    fn clear_after_grace(&self, generation: u64) {
        let mut inner = lock(&self.inner);
        if inner.generation != generation {
            debug!(generation, "Dropping stale grace clear");
            return;
        }

        inner.pending_clear = None;
        inner.state = PlaybackState::default();
        debug!(generation, "Finished recording cleared");
        self.commit(inner);
    }
}

/// Single owner of "what is currently playing".
///
/// At most one recording is loaded at a time: `play` stops whatever was
/// playing before loading the next one. Device finish reports arrive on
/// the tokio runtime and are applied under the same lock as the public
/// operations, tagged with a generation so a report from a replaced
/// stream can never clobber newer state.
pub struct PlaybackSessionManager {
    shared: Arc<Shared>,
    runtime: Handle,
}

impl PlaybackSessionManager {
    /// Creates a manager on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::RuntimeUnavailable`] outside a runtime.
    #[track_caller]
    pub fn new(device: Box<dyn PlaybackDevice>, grace_delay: Duration) -> PlaybackResult<Self> {
        let runtime = Handle::try_current().map_err(|_| PlaybackError::RuntimeUnavailable {
            location: ErrorLocation::from(Location::caller()),
        })?;
        Ok(Self::with_runtime(device, grace_delay, runtime))
    }

    /// Creates a manager that runs finish watchers on `runtime`.
    pub fn with_runtime(
        device: Box<dyn PlaybackDevice>,
        grace_delay: Duration,
        runtime: Handle,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    device,
                    state: PlaybackState::default(),
                    generation: 0,
                    loaded: false,
                    pending_clear: None,
                }),
                observers: Observers::new(),
                grace_delay,
            }),
            runtime,
        }
    }

    /// Current state snapshot.
    pub fn state(&self) -> PlaybackState {
        lock(&self.shared.inner).state.clone()
    }

    /// Delay between natural completion and clearing the current recording.
    pub fn grace_delay(&self) -> Duration {
        self.shared.grace_delay
    }

    /// Registers a listener called after every state change.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&PlaybackState) + Send + Sync + 'static,
    {
        self.shared.observers.subscribe(listener)
    }

    /// Plays `recording`, stopping whatever was playing first.
    ///
    /// On failure nothing is current and nothing is playing.
    ///
    /// # Errors
    ///
    /// - [`PlaybackError::DeviceSetupFailed`] if the session or stream could
    ///   not be configured.
    /// - [`PlaybackError::DecodeFailed`] if the payload is empty or unreadable.
    #[track_caller]
    #[instrument(skip(self, recording), fields(recording_id = %recording.id))]
    pub fn play(&self, recording: &Recording) -> PlaybackResult<()> {
        let caller = Location::caller();
        let mut inner = lock(&self.shared.inner);

        let generation = inner.invalidate();
        if let Some(previous) = &inner.state.current_recording {
            info!(previous_id = %previous.id, "Stopping current playback");
        }
        inner.unload();
        inner.state = PlaybackState::default();

        match Self::start_stream(&mut inner, recording, caller) {
            Ok(finished) => {
                inner.loaded = true;
                inner.state = PlaybackState {
                    current_recording: Some(recording.summary()),
                    is_playing: true,
                };
                info!(generation, "Playback started");
                self.shared.commit(inner);
                self.watch_finish(generation, finished);
                Ok(())
            }
            Err(e) => {
                inner.device.stop();
                warn!(generation, error = %e, "Playback failed to start");
                self.shared.commit(inner);
                Err(e)
            }
        }
    }

    /// Halts playback, keeping the recording current.
    ///
    /// Ignored when nothing is playing.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn pause(&self) -> PlaybackResult<Transition> {
        let caller = Location::caller();
        let mut inner = lock(&self.shared.inner);

        if !inner.state.is_playing {
            info!("Pause ignored: nothing is playing");
            return Ok(Transition::Ignored);
        }

        if let Err(fault) = inner.device.pause() {
            return Err(self.abort(inner, fault, caller));
        }

        inner.state.is_playing = false;
        info!("Playback paused");
        self.shared.commit(inner);

        Ok(Transition::Applied)
    }

    /// Continues a paused recording.
    ///
    /// Ignored when nothing is loaded or it is already playing.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn resume(&self) -> PlaybackResult<Transition> {
        let caller = Location::caller();
        let mut inner = lock(&self.shared.inner);

        if inner.state.current_recording.is_none() || !inner.loaded {
            info!("Resume ignored: no recording loaded");
            return Ok(Transition::Ignored);
        }
        if inner.state.is_playing {
            debug!("Resume ignored: already playing");
            return Ok(Transition::Ignored);
        }

        if let Err(fault) = inner.device.resume() {
            return Err(self.abort(inner, fault, caller));
        }

        inner.state.is_playing = true;
        info!("Playback resumed");
        self.shared.commit(inner);

        Ok(Transition::Applied)
    }

    /// Stops playback and clears the current recording.
    ///
    /// Ignored when nothing is current. Never fails.
    #[instrument(skip(self))]
    pub fn stop(&self) -> Transition {
        let mut inner = lock(&self.shared.inner);

        inner.invalidate();
        let had_stream = inner.loaded;
        inner.unload();

        if inner.state.current_recording.is_none() && !had_stream {
            info!("Stop ignored: nothing is playing");
            return Transition::Ignored;
        }

        inner.state = PlaybackState::default();
        info!("Playback stopped");
        self.shared.commit(inner);

        Transition::Applied
    }

    fn start_stream(
        inner: &mut Inner,
        recording: &Recording,
        caller: &'static Location<'static>,
    ) -> PlaybackResult<oneshot::Receiver<PlaybackEnd>> {
        if recording.audio_data.is_empty() {
            return Err(PlaybackError::DecodeFailed {
                recording_id: recording.id,
                reason: "recording has no audio data".to_string(),
                location: ErrorLocation::from(caller),
            });
        }

        inner
            .device
            .activate_session()
            .map_err(|fault| setup_failed(fault, caller))?;

        let (signal, finished) = FinishSignal::channel();
        inner
            .device
            .load(&recording.audio_data, signal)
            .map_err(|fault| match fault {
                DeviceFault::Decode { reason } => PlaybackError::DecodeFailed {
                    recording_id: recording.id,
                    reason,
                    location: ErrorLocation::from(caller),
                },
                other => setup_failed(other, caller),
            })?;

        inner
            .device
            .play()
            .map_err(|fault| setup_failed(fault, caller))?;

        debug!(payload_len = recording.audio_data.len(), "Stream loaded");

        Ok(finished)
    }

    fn watch_finish(&self, generation: u64, finished: oneshot::Receiver<PlaybackEnd>) {
        let shared = Arc::clone(&self.shared);
        let runtime = self.runtime.clone();
        self.runtime.spawn(async move {
            match finished.await {
                Ok(end) => shared.on_finished(&runtime, generation, end),
                Err(_) => debug!(generation, "Finish signal dropped without firing"),
            }
        });
    }

    /// Returns to idle after a device fault mid-stream.
    fn abort(
        &self,
        mut inner: MutexGuard<'_, Inner>,
        fault: DeviceFault,
        caller: &'static Location<'static>,
    ) -> PlaybackError {
        inner.invalidate();
        inner.device.stop();
        inner.loaded = false;
        inner.state = PlaybackState::default();
        warn!(error = %fault, "Playback device fault, returning to idle");
        self.shared.commit(inner);
        setup_failed(fault, caller)
    }
}

impl Drop for PlaybackSessionManager {
    fn drop(&mut self) {
        let mut inner = lock(&self.shared.inner);
        inner.invalidate();
        inner.unload();
    }
}

fn setup_failed(fault: DeviceFault, caller: &'static Location<'static>) -> PlaybackError {
    PlaybackError::DeviceSetupFailed {
        reason: fault.to_string(),
        location: ErrorLocation::from(caller),
    }
}
