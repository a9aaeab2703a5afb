//! Voice Memo Core Library
//!
//! Recording and playback lifecycle for a voice-memo app: one capture at a
//! time, one playback at a time, and a single-select picker, each exposed
//! as observable state for a presentation layer to render.
//!
//! # Example
//!
//! ```no_run
//! use voice_memo_core::{
//!     CaptureDevice, FileRecordingRepository, RecordingRepository, RecordingSessionManager,
//!     SortOrder,
//! };
//!
//! use std::{sync::Arc, thread::sleep, time::Duration};
//!
//! fn record_memo(microphone: Box<dyn CaptureDevice>) -> Result<(), Box<dyn std::error::Error>> {
//!     let repository: Arc<dyn RecordingRepository> =
//!         Arc::new(FileRecordingRepository::open("recordings")?);
//!     let mut recorder = RecordingSessionManager::new(microphone, Arc::clone(&repository));
//!
//!     recorder.start_recording()?;
//!     sleep(Duration::from_secs(3));
//!     let recording = recorder.stop_recording(Some("Memo"))?;
//!
//!     println!("Saved {} ({:?})", recording.display_name(), recording.duration());
//!     println!("{} recordings stored", repository.list(SortOrder::NewestFirst)?.len());
//!     Ok(())
//! }
//! ```
//!
//! With the `hardware` feature, `CpalCaptureDevice` and `CpalPlaybackDevice`
//! provide the default microphone and speaker.

pub mod audio;
mod error;
mod observers;
mod recording;
mod session;
mod store;
mod sync;

pub use {
    audio::{CaptureDevice, CapturedAudio, FinishSignal, PlaybackDevice, PlaybackEnd},
    error::{
        AudioError, AudioResult, DeviceFault, PlaybackError, PlaybackResult, RecordingError,
        RecordingResult, StoreError, StoreResult,
    },
    observers::Subscription,
    recording::{FALLBACK_DISPLAY_NAME, Recording, RecordingSummary, SortOrder},
    session::{
        DEFAULT_GRACE_DELAY, DEFAULT_RECORDING_NAME, PlaybackPhase, PlaybackSessionManager,
        PlaybackState, RecordingPhase, RecordingSessionManager, RecordingState,
        SelectionCoordinator, SelectionState, Transition,
    },
    store::{FileRecordingRepository, MemoryRecordingRepository, RecordingRepository},
};

#[cfg(feature = "hardware")]
pub use audio::{CpalCaptureDevice, CpalPlaybackDevice};
