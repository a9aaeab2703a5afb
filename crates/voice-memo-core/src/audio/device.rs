//! Contracts between the session managers and the platform audio devices.

use crate::DeviceFault;

use std::time::Duration;

use tokio::sync::oneshot;

/// Audio handed back by a capture device when it finalizes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CapturedAudio {
    /// Encoded payload. Empty when nothing was captured.
    pub payload: Vec<u8>,
    /// Length of the captured audio.
    pub duration: Duration,
}

/// Records audio into a buffer it owns until [`CaptureDevice::finish`].
pub trait CaptureDevice: Send {
    /// Acquires the device and starts buffering.
    fn start(&mut self) -> Result<(), DeviceFault>;

    /// Suspends buffering without discarding what was captured.
    fn pause(&mut self) -> Result<(), DeviceFault>;

    /// Continues buffering after [`CaptureDevice::pause`].
    fn resume(&mut self) -> Result<(), DeviceFault>;

    /// Stops the device and finalizes the buffer into a payload.
    ///
    /// Releases the device whether or not finalizing succeeds.
    fn finish(&mut self) -> Result<CapturedAudio, DeviceFault>;
}

/// How a loaded stream ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEnd {
    /// Reached end-of-stream.
    Completed,
    /// Cut short by the platform (interruption, route change, stream error).
    Interrupted {
        /// Description reported by the device.
        reason: String,
    },
}

/// One-shot callback a playback device fires when the loaded stream ends.
///
/// Each [`PlaybackDevice::load`] gets its own signal. Firing it from any
/// thread is fine; the session manager marshals the result onto its own
/// state. Dropping it without firing means the stream was torn down and
/// nobody needs to hear about it.
#[derive(Debug)]
pub struct FinishSignal {
    tx: oneshot::Sender<PlaybackEnd>,
}

impl FinishSignal {
    pub(crate) fn channel() -> (Self, oneshot::Receiver<PlaybackEnd>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx }, rx)
    }

    /// Reports that the stream played to the end.
    pub fn completed(self) {
        let _ = self.tx.send(PlaybackEnd::Completed);
    }

    /// Reports that the stream was cut short.
    pub fn interrupted(self, reason: impl Into<String>) {
        let _ = self.tx.send(PlaybackEnd::Interrupted {
            reason: reason.into(),
        });
    }
}

/// Decodes and plays one payload at a time.
pub trait PlaybackDevice: Send {
    /// Configures the platform audio session for playback.
    fn activate_session(&mut self) -> Result<(), DeviceFault>;

    /// Decodes `payload` and prepares it for playback.
    ///
    /// Returns [`DeviceFault::Decode`] when the payload is unreadable.
    fn load(&mut self, payload: &[u8], on_finish: FinishSignal) -> Result<(), DeviceFault>;

    /// Starts the loaded stream.
    fn play(&mut self) -> Result<(), DeviceFault>;

    /// Halts the loaded stream, keeping its position.
    fn pause(&mut self) -> Result<(), DeviceFault>;

    /// Continues the loaded stream from where it was paused.
    fn resume(&mut self) -> Result<(), DeviceFault>;

    /// Tears down the loaded stream. Safe to call when nothing is loaded.
    fn stop(&mut self);
}
