use crate::config::default_grace_delay_ms;

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Playback behaviour configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// How long a finished recording stays current before clearing.
    #[serde(default = "default_grace_delay_ms")]
    pub grace_delay_ms: u64,
}

impl PlaybackConfig {
    /// The grace delay as a [`Duration`].
    pub fn grace_delay(&self) -> Duration {
        Duration::from_millis(self.grace_delay_ms)
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            grace_delay_ms: default_grace_delay_ms(),
        }
    }
}
