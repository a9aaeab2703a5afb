use crate::{
    DeviceFault, Recording, RecordingError, RecordingResult, RecordingSummary,
    audio::CaptureDevice,
    observers::{Observers, Subscription},
    session::Transition,
    store::RecordingRepository,
};

use std::{
    panic::Location,
    sync::Arc,
    time::{Duration, Instant},
};

use error_location::ErrorLocation;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Name given to recordings stopped without one.
pub const DEFAULT_RECORDING_NAME: &str = "Recording";

/// Phase of the capture state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordingPhase {
    /// Not recording.
    #[default]
    Idle,
    /// Capturing audio.
    Recording,
    /// Recording in progress but capture suspended.
    Paused,
}

/// Snapshot of the recording session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecordingState {
    /// Current phase.
    pub phase: RecordingPhase,
    /// Captured time so far, excluding paused intervals.
    pub elapsed: Duration,
}

impl RecordingState {
    /// A recording is in progress (capturing or paused).
    pub fn is_recording(&self) -> bool {
        self.phase != RecordingPhase::Idle
    }

    /// A recording is in progress but paused.
    pub fn is_paused(&self) -> bool {
        self.phase == RecordingPhase::Paused
    }
}

/// Elapsed-time accumulator that skips paused intervals.
#[derive(Debug, Default)]
struct Stopwatch {
    running_since: Option<Instant>,
    banked: Duration,
}

impl Stopwatch {
    fn start(&mut self) {
        self.banked = Duration::ZERO;
        self.running_since = Some(Instant::now());
    }

    fn hold(&mut self) {
        if let Some(since) = self.running_since.take() {
            self.banked += since.elapsed();
        }
    }

    fn release(&mut self) {
        self.running_since.get_or_insert_with(Instant::now);
    }

    fn elapsed(&self) -> Duration {
        self.banked + self.running_since.map(|s| s.elapsed()).unwrap_or_default()
    }

    fn reset(&mut self) -> Duration {
        let total = self.elapsed();
        *self = Self::default();
        total
    }
}

/// Single owner of "is a recording in progress".
///
/// Drives the capture device through `Idle -> Recording <-> Paused -> Idle`
/// and hands each finished capture to the repository. A capture the
/// repository rejects is kept as the pending recording until it is retried
/// or discarded.
pub struct RecordingSessionManager {
    device: Box<dyn CaptureDevice>,
    repository: Arc<dyn RecordingRepository>,
    observers: Observers<RecordingState>,
    phase: RecordingPhase,
    stopwatch: Stopwatch,
    /// Correlates log lines of one capture.
    session_id: Option<Uuid>,
    default_name: String,
    pending: Option<Recording>,
}

impl RecordingSessionManager {
    /// Creates an idle manager that persists into `repository`.
    pub fn new(device: Box<dyn CaptureDevice>, repository: Arc<dyn RecordingRepository>) -> Self {
        Self {
            device,
            repository,
            observers: Observers::new(),
            phase: RecordingPhase::Idle,
            stopwatch: Stopwatch::default(),
            session_id: None,
            default_name: DEFAULT_RECORDING_NAME.to_string(),
            pending: None,
        }
    }

    /// Overrides the name used when `stop_recording` gets none.
    pub fn with_default_name(mut self, name: impl Into<String>) -> Self {
        self.default_name = name.into();
        self
    }

    /// Current state snapshot.
    pub fn state(&self) -> RecordingState {
        RecordingState {
            phase: self.phase,
            elapsed: self.stopwatch.elapsed(),
        }
    }

    /// Registers a listener called after every state change.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&RecordingState) + Send + Sync + 'static,
    {
        self.observers.subscribe(listener)
    }

    /// Starts a new recording.
    ///
    /// # Errors
    ///
    /// - [`RecordingError::AlreadyRecording`] if one is in progress.
    /// - [`RecordingError::DeviceUnavailable`] if the microphone cannot be
    ///   acquired.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn start_recording(&mut self) -> RecordingResult<()> {
        if self.phase != RecordingPhase::Idle {
            warn!(session_id = ?self.session_id, "Start ignored: already recording");
            return Err(RecordingError::AlreadyRecording {
                location: ErrorLocation::from(Location::caller()),
            });
        }

        self.device
            .start()
            .map_err(|fault| RecordingError::DeviceUnavailable {
                reason: fault.to_string(),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let session_id = Uuid::new_v4();
        self.session_id = Some(session_id);
        self.phase = RecordingPhase::Recording;
        self.stopwatch.start();

        info!(session_id = %session_id, "Recording started");
        self.notify();

        Ok(())
    }

    /// Suspends capture. Ignored unless actively recording.
    ///
    /// # Errors
    ///
    /// Returns [`RecordingError::CaptureFailed`] if the device fails; the
    /// capture is abandoned and the session returns to idle.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn pause_recording(&mut self) -> RecordingResult<Transition> {
        if self.phase != RecordingPhase::Recording {
            info!("Pause ignored: not recording");
            return Ok(Transition::Ignored);
        }

        if let Err(fault) = self.device.pause() {
            return Err(self.abandon(fault, Location::caller()));
        }

        self.phase = RecordingPhase::Paused;
        self.stopwatch.hold();
        info!(session_id = ?self.session_id, "Recording paused");
        self.notify();

        Ok(Transition::Applied)
    }

    /// Continues a paused capture. Ignored unless paused.
    ///
    /// # Errors
    ///
    /// Returns [`RecordingError::CaptureFailed`] if the device fails; the
    /// capture is abandoned and the session returns to idle.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn resume_recording(&mut self) -> RecordingResult<Transition> {
        if self.phase != RecordingPhase::Paused {
            info!("Resume ignored: not paused");
            return Ok(Transition::Ignored);
        }

        if let Err(fault) = self.device.resume() {
            return Err(self.abandon(fault, Location::caller()));
        }

        self.phase = RecordingPhase::Recording;
        self.stopwatch.release();
        info!(session_id = ?self.session_id, "Recording resumed");
        self.notify();

        Ok(Transition::Applied)
    }

    /// Finalizes the capture and persists it.
    ///
    /// `name` is trimmed; a missing or blank name uses the default name.
    ///
    /// # Errors
    ///
    /// - [`RecordingError::NotRecording`] if idle.
    /// - [`RecordingError::CaptureFailed`] if the device produced nothing or
    ///   failed to finalize. Nothing is persisted.
    /// - [`RecordingError::PersistFailed`] if the repository rejected the
    ///   recording. It is kept as pending for [`Self::retry_persist`].
    #[track_caller]
    #[instrument(skip(self))]
    pub fn stop_recording(&mut self, name: Option<&str>) -> RecordingResult<Recording> {
        if self.phase == RecordingPhase::Idle {
            info!("Stop ignored: not recording");
            return Err(RecordingError::NotRecording {
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let captured = self.device.finish();
        let session_id = self.session_id.take();
        let elapsed = self.stopwatch.reset();
        self.phase = RecordingPhase::Idle;
        self.notify();

        let captured = captured.map_err(|fault| {
            error!(session_id = ?session_id, error = %fault, "Capture failed to finalize");
            RecordingError::CaptureFailed {
                reason: fault.to_string(),
                location: ErrorLocation::from(Location::caller()),
            }
        })?;

        if captured.payload.is_empty() {
            warn!(session_id = ?session_id, elapsed_ms = elapsed.as_millis(), "Capture produced no audio");
            return Err(RecordingError::CaptureFailed {
                reason: "no audio captured".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(self.default_name.as_str())
            .to_string();

        let recording = Recording::new(Some(name), captured.payload);
        info!(
            session_id = ?session_id,
            recording_id = %recording.id,
            payload_len = recording.audio_data.len(),
            duration_ms = captured.duration.as_millis(),
            "Recording stopped"
        );

        self.persist(recording, Location::caller())
    }

    /// The captured recording still waiting to be persisted, if any.
    pub fn pending_recording(&self) -> Option<RecordingSummary> {
        self.pending.as_ref().map(Recording::summary)
    }

    /// Tries again to persist the pending recording.
    ///
    /// # Errors
    ///
    /// - [`RecordingError::NoPendingRecording`] if nothing is pending.
    /// - [`RecordingError::PersistFailed`] if the repository rejects it
    ///   again. It stays pending.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn retry_persist(&mut self) -> RecordingResult<Recording> {
        let recording = self
            .pending
            .take()
            .ok_or_else(|| RecordingError::NoPendingRecording {
                location: ErrorLocation::from(Location::caller()),
            })?;

        info!(recording_id = %recording.id, "Retrying persist");
        self.persist(recording, Location::caller())
    }

    /// Drops the pending recording, returning it.
    pub fn discard_pending(&mut self) -> Option<Recording> {
        let discarded = self.pending.take();
        if let Some(recording) = &discarded {
            warn!(recording_id = %recording.id, "Pending recording discarded");
        }
        discarded
    }

    fn persist(
        &mut self,
        recording: Recording,
        caller: &'static Location<'static>,
    ) -> RecordingResult<Recording> {
        match self.repository.create(&recording) {
            Ok(()) => {
                debug!(recording_id = %recording.id, "Recording persisted");
                Ok(recording)
            }
            Err(source) => {
                error!(recording_id = %recording.id, error = %source, "Failed to persist recording");
                let recording_id = recording.id;
                if let Some(replaced) = self.pending.replace(recording) {
                    warn!(recording_id = %replaced.id, "Older pending recording dropped");
                }
                Err(RecordingError::PersistFailed {
                    recording_id,
                    source,
                    location: ErrorLocation::from(caller),
                })
            }
        }
    }

    /// Releases the device after a mid-capture fault and returns to idle.
    fn abandon(&mut self, fault: DeviceFault, caller: &'static Location<'static>) -> RecordingError {
        if let Err(e) = self.device.finish() {
            debug!(error = %e, "Finalize after fault also failed");
        }
        error!(session_id = ?self.session_id, error = %fault, "Capture device fault, recording abandoned");

        self.session_id = None;
        self.stopwatch.reset();
        self.phase = RecordingPhase::Idle;
        self.notify();

        RecordingError::CaptureFailed {
            reason: fault.to_string(),
            location: ErrorLocation::from(caller),
        }
    }

    fn notify(&self) {
        self.observers.notify(&self.state());
    }
}
