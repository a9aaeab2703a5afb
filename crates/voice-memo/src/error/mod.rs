use voice_memo_core::{PlaybackError, RecordingError, StoreError};

use std::{panic::Location, result::Result as StdResult};

use error_location::ErrorLocation;
use thiserror::Error;

/// Application-level errors for the voice-memo binary.
///
/// All variants include `ErrorLocation` for call-site tracking.
#[derive(Error, Debug)]
pub enum AppError {
    /// Playback session error from voice-memo-core.
    #[error("Playback error: {source} {location}")]
    Playback {
        /// The underlying playback error.
        #[source]
        source: PlaybackError,
        /// Location where this error was created.
        location: ErrorLocation,
    },

    /// Recording session error from voice-memo-core.
    #[error("Recording error: {source} {location}")]
    Recording {
        /// The underlying recording error.
        #[source]
        source: RecordingError,
        /// Location where this error was created.
        location: ErrorLocation,
    },

    /// Recording store error from voice-memo-core.
    #[error("Store error: {source} {location}")]
    Store {
        /// The underlying store error.
        #[source]
        source: StoreError,
        /// Location where this error was created.
        location: ErrorLocation,
    },

    /// A typed command could not be understood or refers to nothing.
    #[error("Invalid command: {reason} {location}")]
    InvalidCommand {
        /// Human-readable reason for failure.
        reason: String,
        /// Location where this error was created.
        location: ErrorLocation,
    },

    /// The binary was built without audio device support.
    #[error("Audio hardware unavailable: {reason} {location}")]
    HardwareUnavailable {
        /// Human-readable reason for failure.
        reason: String,
        /// Location where this error was created.
        location: ErrorLocation,
    },

    /// Failed to send message through async channel.
    #[error("Channel send failed: {message} {location}")]
    ChannelSendFailed {
        /// Human-readable error message.
        message: String,
        /// Location where this error was created.
        location: ErrorLocation,
    },

    /// Configuration loading or saving error.
    #[error("Configuration error: {reason} {location}")]
    ConfigError {
        /// Human-readable reason for failure.
        reason: String,
        /// Location where this error was created.
        location: ErrorLocation,
    },

    /// IO error from filesystem operations.
    #[error("IO error: {source} {location}")]
    IoError {
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
        /// Location where this error was created.
        location: ErrorLocation,
    },
}

// Manual From impls with location tracking.
// Cannot use #[from] because it does not support extra fields.
impl From<PlaybackError> for AppError {
    #[track_caller]
    fn from(source: PlaybackError) -> Self {
        AppError::Playback {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<RecordingError> for AppError {
    #[track_caller]
    fn from(source: RecordingError) -> Self {
        AppError::Recording {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<StoreError> for AppError {
    #[track_caller]
    fn from(source: StoreError) -> Self {
        AppError::Store {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<std::io::Error> for AppError {
    #[track_caller]
    fn from(source: std::io::Error) -> Self {
        AppError::IoError {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

/// Convenience type alias for Results using `AppError`.
pub type Result<T> = StdResult<T, AppError>;
