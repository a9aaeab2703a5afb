use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Recording store configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding recordings (None = `recordings` under the data dir).
    #[serde(default)]
    pub directory: Option<PathBuf>,
}
