//! Audio devices and payload processing.
//!
//! The device traits are what the session managers drive. [`codec`] and the
//! resampler turn captured samples into stored payloads and back, and the cpal
//! shims (behind the `hardware` feature) talk to the default microphone and
//! speaker.

#[cfg(feature = "hardware")]
mod capture;
pub mod codec;
mod device;
#[cfg(feature = "hardware")]
mod playback;
mod resampler;

pub(crate) use resampler::Resampler;

pub use device::{CaptureDevice, CapturedAudio, FinishSignal, PlaybackDevice, PlaybackEnd};

#[cfg(feature = "hardware")]
pub use {capture::CpalCaptureDevice, playback::CpalPlaybackDevice};
