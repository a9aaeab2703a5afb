use crate::{
    DeviceFault,
    audio::{FinishSignal, PlaybackDevice, Resampler, codec},
    sync::lock,
};

use std::sync::{Arc, Mutex};

use cpal::{
    Device, Stream, StreamConfig,
    traits::{DeviceTrait, HostTrait, StreamTrait},
};
use tracing::{debug, error, info, instrument};

/// Default output device via cpal.
///
/// `activate_session` acquires the device, `load` decodes the payload and
/// builds a paused output stream, and the output callback fires the finish
/// signal once the last sample has been written.
pub struct CpalPlaybackDevice {
    output: Option<(Device, StreamConfig)>,
    stream: Option<Stream>,
    finish: Arc<Mutex<Option<FinishSignal>>>,
}

impl CpalPlaybackDevice {
    /// Creates a playback device with no output acquired yet.
    pub fn new() -> Self {
        Self {
            output: None,
            stream: None,
            finish: Arc::new(Mutex::new(None)),
        }
    }
}

impl Default for CpalPlaybackDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackDevice for CpalPlaybackDevice {
    #[instrument(skip(self))]
    fn activate_session(&mut self) -> Result<(), DeviceFault> {
        if self.output.is_some() {
            return Ok(());
        }

        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| DeviceFault::Setup {
                reason: "No output device found".to_string(),
            })?;

        let config = device
            .default_output_config()
            .map_err(|e| DeviceFault::Setup {
                reason: format!("Failed to get output config: {}", e),
            })?;

        let config: StreamConfig = config.into();
        info!(
            sample_rate = config.sample_rate,
            channels = config.channels,
            "Playback session activated"
        );

        self.output = Some((device, config));
        Ok(())
    }

    #[instrument(skip(self, payload, on_finish), fields(payload_len = payload.len()))]
    fn load(&mut self, payload: &[u8], on_finish: FinishSignal) -> Result<(), DeviceFault> {
        self.stop();

        let (device, config) = self.output.as_ref().ok_or_else(|| DeviceFault::Setup {
            reason: "Playback session is not active".to_string(),
        })?;

        let decoded = codec::decode_wav(payload).map_err(|e| DeviceFault::Decode {
            reason: e.to_string(),
        })?;

        let samples = if decoded.sample_rate == config.sample_rate {
            decoded.samples
        } else {
            Resampler::new(decoded.sample_rate, config.sample_rate)
                .and_then(|mut r| r.resample(&decoded.samples))
                .map_err(|e| DeviceFault::Setup {
                    reason: e.to_string(),
                })?
        };

        *lock(&self.finish) = Some(on_finish);

        let channels = usize::from(config.channels.max(1));
        let frame_count = samples.len();
        let mut position = 0usize;
        let finish_on_end = Arc::clone(&self.finish);
        let finish_on_error = Arc::clone(&self.finish);

        let stream = device
            .build_output_stream(
                config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    for frame in data.chunks_mut(channels) {
                        let value = samples.get(position).copied().unwrap_or(0.0);
                        frame.fill(value);
                        position = position.saturating_add(1);
                    }
                    if position >= frame_count {
                        let signal = finish_on_end
                            .lock()
                            .unwrap_or_else(|e| e.into_inner())
                            .take();
                        if let Some(signal) = signal {
                            signal.completed();
                        }
                    }
                },
                move |err| {
                    error!("Playback stream error: {}", err);
                    let signal = finish_on_error
                        .lock()
                        .unwrap_or_else(|e| e.into_inner())
                        .take();
                    if let Some(signal) = signal {
                        signal.interrupted(err.to_string());
                    }
                },
                None,
            )
            .map_err(|e| DeviceFault::Setup {
                reason: format!("Failed to build output stream: {}", e),
            })?;

        debug!(frame_count, "Payload loaded");
        self.stream = Some(stream);

        Ok(())
    }

    fn play(&mut self) -> Result<(), DeviceFault> {
        let stream = self.stream.as_ref().ok_or_else(|| DeviceFault::Setup {
            reason: "Nothing loaded".to_string(),
        })?;
        stream.play().map_err(|e| DeviceFault::Setup {
            reason: format!("Failed to start output stream: {}", e),
        })
    }

    fn pause(&mut self) -> Result<(), DeviceFault> {
        let stream = self.stream.as_ref().ok_or_else(|| DeviceFault::Setup {
            reason: "Nothing loaded".to_string(),
        })?;
        stream.pause().map_err(|e| DeviceFault::Setup {
            reason: format!("Failed to pause output stream: {}", e),
        })
    }

    fn resume(&mut self) -> Result<(), DeviceFault> {
        self.play()
    }

    fn stop(&mut self) {
        // A torn-down stream never reports; the manager already moved on.
        lock(&self.finish).take();
        if self.stream.take().is_some() {
            debug!("Output stream stopped");
        }
    }
}
