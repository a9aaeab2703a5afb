use std::path::PathBuf;

use error_location::ErrorLocation;
use thiserror::Error;
use uuid::Uuid;

/// Failure reported by a capture or playback device.
///
/// Device shims report what went wrong; the session manager that called
/// them decides which caller-facing error it becomes and records where.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceFault {
    /// The device could not be acquired (missing, busy, permission denied).
    #[error("device unavailable: {reason}")]
    Unavailable {
        /// Description of the failure.
        reason: String,
    },

    /// Session or stream configuration failed.
    #[error("device setup failed: {reason}")]
    Setup {
        /// Description of the failure.
        reason: String,
    },

    /// The payload handed to the device could not be decoded.
    #[error("payload could not be decoded: {reason}")]
    Decode {
        /// Description of the failure.
        reason: String,
    },

    /// Capturing or finalizing the capture buffer failed.
    #[error("capture failed: {reason}")]
    Capture {
        /// Description of the failure.
        reason: String,
    },
}

/// Playback session errors with source location tracking.
#[derive(Error, Debug)]
pub enum PlaybackError {
    /// Session or device configuration failed. Usually retryable.
    #[error("Playback device setup failed: {reason} {location}")]
    DeviceSetupFailed {
        /// Description of the device failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The recording payload could not be decoded. Indicates corrupt data.
    #[error("Failed to decode recording {recording_id}: {reason} {location}")]
    DecodeFailed {
        /// Recording whose payload was rejected.
        recording_id: Uuid,
        /// Description of the decoder failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// No tokio runtime was available to drive finish notifications.
    #[error("Playback requires a tokio runtime {location}")]
    RuntimeUnavailable {
        /// Source location where error occurred.
        location: ErrorLocation,
    },
}

/// Recording session errors with source location tracking.
#[derive(Error, Debug)]
pub enum RecordingError {
    /// The capture device could not be acquired.
    #[error("Capture device unavailable: {reason} {location}")]
    DeviceUnavailable {
        /// Description of the device failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Capture produced no usable payload. Nothing was persisted.
    #[error("Capture failed: {reason} {location}")]
    CaptureFailed {
        /// Description of the failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The recording was captured but the repository rejected it.
    ///
    /// The recording is retained as pending and can be retried.
    #[error("Failed to persist recording {recording_id}: {source} {location}")]
    PersistFailed {
        /// Id of the retained recording.
        recording_id: Uuid,
        /// Underlying store error.
        #[source]
        source: StoreError,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// A recording is already in progress.
    #[error("A recording is already in progress {location}")]
    AlreadyRecording {
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Stop was requested while no recording was in progress.
    #[error("No recording in progress {location}")]
    NotRecording {
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Retry was requested but no captured recording is waiting to be saved.
    #[error("No pending recording to persist {location}")]
    NoPendingRecording {
        /// Source location where error occurred.
        location: ErrorLocation,
    },
}

/// Recording store errors with source location tracking.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backing store cannot be reached.
    #[error("Recording store unavailable: {reason} {location}")]
    Unavailable {
        /// Description of the failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Reading or writing the backing store failed.
    #[error("Recording store IO failure at {path:?}: {source} {location}")]
    IoFailure {
        /// Path involved in the failed operation.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// A recording with the same id already exists.
    #[error("Recording {id} already exists {location}")]
    DuplicateId {
        /// The conflicting id.
        id: Uuid,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Recordings must carry audio data to be stored.
    #[error("Recording {id} has no audio data {location}")]
    EmptyPayload {
        /// Id of the rejected recording.
        id: Uuid,
        /// Source location where error occurred.
        location: ErrorLocation,
    },
}

/// Audio codec and resampling errors with source location tracking.
#[derive(Error, Debug)]
pub enum AudioError {
    /// Encoding or decoding a WAV payload failed.
    #[error("Codec error: {reason} {location}")]
    CodecError {
        /// Description of the codec error.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Audio resampling failed.
    #[error("Resampling error: {reason} {location}")]
    ResamplingError {
        /// Description of the resampling error.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },
}

/// Result type alias using [`PlaybackError`].
pub type PlaybackResult<T> = std::result::Result<T, PlaybackError>;

/// Result type alias using [`RecordingError`].
pub type RecordingResult<T> = std::result::Result<T, RecordingError>;

/// Result type alias using [`StoreError`].
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Result type alias using [`AudioError`].
pub type AudioResult<T> = std::result::Result<T, AudioError>;
