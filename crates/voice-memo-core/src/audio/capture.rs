use crate::{
    DeviceFault,
    audio::{CaptureDevice, CapturedAudio, codec},
    sync::lock,
};

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use cpal::{
    Stream,
    traits::{DeviceTrait, HostTrait, StreamTrait},
};
use tracing::{debug, error, info, instrument, warn};

/// Longest capture kept, in seconds. Audio past this point is dropped.
pub(crate) const MAX_CAPTURE_SECS: usize = 60 * 60;

/// Default microphone via cpal.
///
/// The device is acquired on [`CaptureDevice::start`] and released on
/// [`CaptureDevice::finish`], so a missing or busy microphone is reported
/// when the user tries to record rather than at startup.
pub struct CpalCaptureDevice {
    stream: Option<Stream>,
    sample_rate: u32,
    samples: Arc<Mutex<Vec<f32>>>,
    /// Set before the stream is dropped so an in-flight callback cannot
    /// append after `finish` has taken the buffer.
    shutdown: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
    stream_error: Arc<Mutex<Option<String>>>,
}

impl CpalCaptureDevice {
    /// Creates an idle capture device.
    pub fn new() -> Self {
        Self {
            stream: None,
            sample_rate: codec::STORAGE_SAMPLE_RATE,
            samples: Arc::new(Mutex::new(Vec::new())),
            shutdown: Arc::new(AtomicBool::new(false)),
            paused: Arc::new(AtomicBool::new(false)),
            stream_error: Arc::new(Mutex::new(None)),
        }
    }
}

impl Default for CpalCaptureDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureDevice for CpalCaptureDevice {
    #[instrument(skip(self))]
    fn start(&mut self) -> Result<(), DeviceFault> {
        let host = cpal::default_host();

        let device = host
            .default_input_device()
            .ok_or_else(|| DeviceFault::Unavailable {
                reason: "No microphone found".to_string(),
            })?;

        let supported = device
            .default_input_config()
            .map_err(|e| DeviceFault::Unavailable {
                reason: format!("Failed to get input config: {}", e),
            })?;

        let channels = usize::from(supported.channels().max(1));
        let config: cpal::StreamConfig = supported.into();
        self.sample_rate = config.sample_rate;

        let max_samples = self.sample_rate as usize * MAX_CAPTURE_SECS;
        lock(&self.samples).clear();
        *lock(&self.stream_error) = None;
        self.shutdown.store(false, Ordering::Release);
        self.paused.store(false, Ordering::Release);

        let samples = Arc::clone(&self.samples);
        let shutdown = Arc::clone(&self.shutdown);
        let paused = Arc::clone(&self.paused);
        let stream_error = Arc::clone(&self.stream_error);

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if shutdown.load(Ordering::Acquire) || paused.load(Ordering::Acquire) {
                        return;
                    }
                    let mut buf = samples.lock().unwrap_or_else(|e| {
                        error!("Capture buffer lock poisoned, recovering: {}", e);
                        e.into_inner()
                    });
                    let room = max_samples.saturating_sub(buf.len());
                    buf.extend(codec::downmix(data, channels).into_iter().take(room));
                },
                move |err| {
                    error!("Capture stream error: {}", err);
                    let mut slot = stream_error.lock().unwrap_or_else(|e| e.into_inner());
                    slot.get_or_insert_with(|| err.to_string());
                },
                None,
            )
            .map_err(|e| DeviceFault::Unavailable {
                reason: format!("Failed to build input stream: {}", e),
            })?;

        stream.play().map_err(|e| DeviceFault::Unavailable {
            reason: format!("Failed to start input stream: {}", e),
        })?;

        self.stream = Some(stream);
        info!(
            sample_rate = self.sample_rate,
            channels, "Audio capture started"
        );

        Ok(())
    }

    fn pause(&mut self) -> Result<(), DeviceFault> {
        self.paused.store(true, Ordering::Release);
        if let Some(stream) = &self.stream {
            if let Err(e) = stream.pause() {
                // The flag already keeps audio out of the buffer.
                debug!("Backend cannot pause input stream: {}", e);
            }
        }
        Ok(())
    }

    fn resume(&mut self) -> Result<(), DeviceFault> {
        let stream = self.stream.as_ref().ok_or_else(|| DeviceFault::Capture {
            reason: "Capture stream is not running".to_string(),
        })?;
        stream.play().map_err(|e| DeviceFault::Capture {
            reason: format!("Failed to resume input stream: {}", e),
        })?;
        self.paused.store(false, Ordering::Release);
        Ok(())
    }

    #[instrument(skip(self))]
    fn finish(&mut self) -> Result<CapturedAudio, DeviceFault> {
        self.shutdown.store(true, Ordering::Release);

        if let Some(stream) = self.stream.take() {
            drop(stream);
            // Give a callback that raced the flag time to return.
            std::thread::sleep(Duration::from_millis(5));
            info!("Audio capture stopped");
        }

        let samples = std::mem::take(&mut *lock(&self.samples));

        if let Some(reason) = lock(&self.stream_error).take() {
            warn!(sample_count = samples.len(), "Discarding capture after stream error");
            return Err(DeviceFault::Capture { reason });
        }

        if samples.is_empty() {
            return Ok(CapturedAudio::default());
        }

        let duration = Duration::from_secs_f64(samples.len() as f64 / f64::from(self.sample_rate));
        let payload =
            codec::encode_memo(&samples, self.sample_rate).map_err(|e| DeviceFault::Capture {
                reason: e.to_string(),
            })?;

        debug!(
            sample_count = samples.len(),
            payload_len = payload.len(),
            "Capture finalized"
        );

        Ok(CapturedAudio { payload, duration })
    }
}
