//! Audio device selection for the host.
//!
//! Real devices are only compiled in with the `hardware` feature. Without
//! it the app still lists, deletes and selects stored recordings.

use crate::AppResult;

use voice_memo_core::{CaptureDevice, PlaybackDevice};

#[cfg(not(feature = "hardware"))]
use {crate::AppError, error_location::ErrorLocation, std::panic::Location};

#[cfg(not(feature = "hardware"))]
const NO_HARDWARE: &str = "built without the `hardware` feature";

/// The default microphone.
#[cfg(feature = "hardware")]
pub(crate) fn capture_device() -> AppResult<Box<dyn CaptureDevice>> {
    Ok(Box::new(voice_memo_core::CpalCaptureDevice::new()))
}

/// The default microphone.
#[cfg(not(feature = "hardware"))]
#[track_caller]
pub(crate) fn capture_device() -> AppResult<Box<dyn CaptureDevice>> {
    Err(AppError::HardwareUnavailable {
        reason: NO_HARDWARE.to_string(),
        location: ErrorLocation::from(Location::caller()),
    })
}

/// The default speaker.
#[cfg(feature = "hardware")]
pub(crate) fn playback_device() -> AppResult<Box<dyn PlaybackDevice>> {
    Ok(Box::new(voice_memo_core::CpalPlaybackDevice::new()))
}

/// The default speaker.
#[cfg(not(feature = "hardware"))]
#[track_caller]
pub(crate) fn playback_device() -> AppResult<Box<dyn PlaybackDevice>> {
    Err(AppError::HardwareUnavailable {
        reason: NO_HARDWARE.to_string(),
        location: ErrorLocation::from(Location::caller()),
    })
}
