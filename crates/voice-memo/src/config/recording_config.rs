use crate::config::default_recording_name;

use serde::{Deserialize, Serialize};

/// Recording behaviour configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingConfig {
    /// Name given to recordings stopped without one.
    #[serde(default = "default_recording_name")]
    pub default_name: String,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            default_name: default_recording_name(),
        }
    }
}
