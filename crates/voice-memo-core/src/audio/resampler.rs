use crate::{AudioError, AudioResult};

use std::panic::Location;

use audioadapter_buffers::direct::InterleavedSlice;
use error_location::ErrorLocation;
use rubato::{Fft, FixedSync, Resampler as RubatoResampler};
use tracing::{debug, instrument};

const CHUNK_SIZE: usize = 1024;
const SUB_CHUNKS: usize = 2;

/// Mono sample-rate converter.
///
/// Capture uses it to bring device audio down to the storage rate and
/// playback uses it to bring stored audio up to the output device rate.
pub struct Resampler {
    resampler: Fft<f32>,
    input_rate: u32,
    output_rate: u32,
}

impl Resampler {
    #[track_caller]
    #[instrument]
    pub fn new(input_rate: u32, output_rate: u32) -> AudioResult<Self> {
        if input_rate == 0 || output_rate == 0 {
            return Err(AudioError::ResamplingError {
                reason: format!("Invalid sample rates: {} -> {}", input_rate, output_rate),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let resampler = Fft::<f32>::new(
            input_rate as usize,
            output_rate as usize,
            CHUNK_SIZE,
            SUB_CHUNKS,
            1,
            FixedSync::Input,
        )
        .map_err(|e| AudioError::ResamplingError {
            reason: format!("Failed to create resampler: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        debug!(input_rate, output_rate, "Resampler initialized");

        Ok(Self {
            resampler,
            input_rate,
            output_rate,
        })
    }

    /// Resamples a complete clip.
    ///
    /// The filter delay is trimmed from the front and the tail is flushed
    /// with silence, so the output is aligned with the input and its length
    /// matches the rate ratio.
    #[track_caller]
    #[instrument(skip(self, samples), fields(input_len = samples.len()))]
    pub fn resample(&mut self, samples: &[f32]) -> AudioResult<Vec<f32>> {
        if samples.is_empty() {
            return Ok(Vec::new());
        }

        self.resampler.reset();

        let expected_len =
            (samples.len() as f64 * self.output_rate as f64 / self.input_rate as f64) as usize;
        let delay = self.resampler.output_delay();
        let mut output = Vec::with_capacity(expected_len + delay);

        for chunk in samples.chunks(CHUNK_SIZE) {
            self.process_chunk(chunk, &mut output)?;
        }

        let silence = [0.0f32; CHUNK_SIZE];
        while output.len() < expected_len + delay {
            let before = output.len();
            self.process_chunk(&silence, &mut output)?;
            if output.len() == before {
                break;
            }
        }

        output.drain(..delay.min(output.len()));
        output.truncate(expected_len);

        debug!(
            output_len = output.len(),
            input_rate = self.input_rate,
            output_rate = self.output_rate,
            "Resampled audio"
        );

        Ok(output)
    }

    #[track_caller]
    fn process_chunk(&mut self, chunk: &[f32], output: &mut Vec<f32>) -> AudioResult<()> {
        let mut padded;
        let input_chunk = if chunk.len() < CHUNK_SIZE {
            padded = chunk.to_vec();
            padded.resize(CHUNK_SIZE, 0.0);
            &padded[..]
        } else {
            chunk
        };

        let input_adapter = InterleavedSlice::new(input_chunk, 1, CHUNK_SIZE).map_err(|e| {
            AudioError::ResamplingError {
                reason: format!("Failed to create input adapter: {}", e),
                location: ErrorLocation::from(Location::caller()),
            }
        })?;

        let output_frames = self.resampler.output_frames_max();
        let mut output_chunk = vec![0.0f32; output_frames];

        let mut output_adapter = InterleavedSlice::new_mut(&mut output_chunk, 1, output_frames)
            .map_err(|e| AudioError::ResamplingError {
                reason: format!("Failed to create output adapter: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let (_, written) = self
            .resampler
            .process_into_buffer(&input_adapter, &mut output_adapter, None)
            .map_err(|e| AudioError::ResamplingError {
                reason: format!("Resampling failed: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        output.extend_from_slice(&output_chunk[..written]);
        Ok(())
    }
}
