#[allow(clippy::module_inception)]
mod config;
mod playback_config;
mod recording_config;
mod storage_config;

pub(crate) use {
    config::Config, playback_config::PlaybackConfig, recording_config::RecordingConfig,
    storage_config::StorageConfig,
};

use voice_memo_core::{DEFAULT_GRACE_DELAY, DEFAULT_RECORDING_NAME};

pub(crate) fn default_grace_delay_ms() -> u64 {
    DEFAULT_GRACE_DELAY.as_millis() as u64
}

pub(crate) fn default_recording_name() -> String {
    DEFAULT_RECORDING_NAME.to_string()
}
