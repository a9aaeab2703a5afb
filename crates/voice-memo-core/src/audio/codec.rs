//! WAV payload encoding and decoding.
//!
//! Stored recordings are mono 16-bit PCM at [`STORAGE_SAMPLE_RATE`]. The
//! decoder accepts any PCM or float WAV and downmixes it to mono, so
//! payloads imported from elsewhere still play.

use crate::{AudioError, AudioResult, audio::Resampler};

use std::{io::Cursor, panic::Location, time::Duration};

use error_location::ErrorLocation;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use tracing::{debug, instrument};

/// Sample rate of stored payloads. Plenty for speech.
pub const STORAGE_SAMPLE_RATE: u32 = 16_000;

/// Mono audio decoded from a payload.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    /// Samples normalized to `[-1.0, 1.0]`.
    pub samples: Vec<f32>,
    /// Sample rate of `samples`.
    pub sample_rate: u32,
}

impl DecodedAudio {
    /// Playback length.
    pub fn duration(&self) -> Duration {
        frames_to_duration(self.samples.len() as u64, self.sample_rate)
    }
}

/// Encodes captured mono samples as a storage payload.
///
/// Resamples to [`STORAGE_SAMPLE_RATE`] first when the device ran at a
/// different rate.
#[track_caller]
#[instrument(skip(samples), fields(sample_count = samples.len()))]
pub fn encode_memo(samples: &[f32], sample_rate: u32) -> AudioResult<Vec<u8>> {
    if sample_rate == STORAGE_SAMPLE_RATE {
        return encode_wav(samples, STORAGE_SAMPLE_RATE);
    }

    let resampled = Resampler::new(sample_rate, STORAGE_SAMPLE_RATE)?.resample(samples)?;
    encode_wav(&resampled, STORAGE_SAMPLE_RATE)
}

/// Writes mono samples as 16-bit PCM WAV.
#[track_caller]
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> AudioResult<Vec<u8>> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::with_capacity(44 + samples.len() * 2));
    let mut writer = WavWriter::new(&mut cursor, spec).map_err(|e| AudioError::CodecError {
        reason: format!("Failed to start WAV stream: {}", e),
        location: ErrorLocation::from(Location::caller()),
    })?;

    for &sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        writer
            .write_sample(value)
            .map_err(|e| AudioError::CodecError {
                reason: format!("Failed to write sample: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;
    }

    writer.finalize().map_err(|e| AudioError::CodecError {
        reason: format!("Failed to finalize WAV stream: {}", e),
        location: ErrorLocation::from(Location::caller()),
    })?;

    let payload = cursor.into_inner();
    debug!(payload_len = payload.len(), sample_rate, "Encoded WAV payload");

    Ok(payload)
}

/// Decodes a WAV payload into mono samples.
#[track_caller]
#[instrument(skip(payload), fields(payload_len = payload.len()))]
pub fn decode_wav(payload: &[u8]) -> AudioResult<DecodedAudio> {
    let mut reader = WavReader::new(Cursor::new(payload)).map_err(|e| AudioError::CodecError {
        reason: format!("Not a WAV payload: {}", e),
        location: ErrorLocation::from(Location::caller()),
    })?;

    let spec = reader.spec();
    if spec.channels == 0 || spec.sample_rate == 0 {
        return Err(AudioError::CodecError {
            reason: format!(
                "Unsupported WAV layout: {} channels at {} Hz",
                spec.channels, spec.sample_rate
            ),
            location: ErrorLocation::from(Location::caller()),
        });
    }

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(|e| AudioError::CodecError {
                reason: format!("Corrupt float samples: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?,
        SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()
                .map_err(|e| AudioError::CodecError {
                    reason: format!("Corrupt PCM samples: {}", e),
                    location: ErrorLocation::from(Location::caller()),
                })?
        }
    };

    let samples = downmix(&interleaved, spec.channels as usize);

    debug!(
        channels = spec.channels,
        sample_rate = spec.sample_rate,
        frames = samples.len(),
        "Decoded WAV payload"
    );

    Ok(DecodedAudio {
        samples,
        sample_rate: spec.sample_rate,
    })
}

/// Reads the playback length from the payload header only.
pub fn duration_of(payload: &[u8]) -> Option<Duration> {
    let reader = WavReader::new(Cursor::new(payload)).ok()?;
    let sample_rate = reader.spec().sample_rate;
    if sample_rate == 0 {
        return None;
    }
    Some(frames_to_duration(u64::from(reader.duration()), sample_rate))
}

/// Averages interleaved frames into a single channel.
pub fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

fn frames_to_duration(frames: u64, sample_rate: u32) -> Duration {
    Duration::from_secs_f64(frames as f64 / f64::from(sample_rate))
}
