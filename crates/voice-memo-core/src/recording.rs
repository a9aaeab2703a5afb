use crate::audio::codec;

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Name shown for recordings persisted without one.
pub const FALLBACK_DISPLAY_NAME: &str = "Recording";

/// A persisted voice recording.
///
/// Immutable once stored. `audio_data` is an encoded WAV payload and is
/// never empty for a record that made it into a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recording {
    /// Unique identifier generated at creation.
    pub id: Uuid,
    /// Optional display name.
    pub name: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Encoded audio payload.
    pub audio_data: Vec<u8>,
}

impl Recording {
    /// Creates a recording with a fresh id stamped with the current time.
    pub fn new(name: Option<String>, audio_data: Vec<u8>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            created_at: Utc::now(),
            audio_data,
        }
    }

    /// Name to show in lists, falling back to [`FALLBACK_DISPLAY_NAME`].
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(FALLBACK_DISPLAY_NAME)
    }

    /// Playback length read from the payload header.
    ///
    /// `None` when the payload is not a readable WAV stream.
    pub fn duration(&self) -> Option<Duration> {
        codec::duration_of(&self.audio_data)
    }

    /// Identifying fields without the payload.
    pub fn summary(&self) -> RecordingSummary {
        RecordingSummary {
            id: self.id,
            name: self.name.clone(),
            created_at: self.created_at,
            payload_len: self.audio_data.len() as u64,
        }
    }
}

/// Copy of a recording's identifying fields.
///
/// Held by session state instead of the recording itself so that state
/// snapshots stay cheap and never keep a deleted payload alive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingSummary {
    /// Recording id.
    pub id: Uuid,
    /// Optional display name.
    pub name: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Payload size in bytes.
    pub payload_len: u64,
}

impl RecordingSummary {
    /// Name to show in lists, falling back to [`FALLBACK_DISPLAY_NAME`].
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(FALLBACK_DISPLAY_NAME)
    }
}

/// Ordering for repository listings, by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Most recent first.
    #[default]
    NewestFirst,
    /// Oldest first.
    OldestFirst,
}

impl SortOrder {
    pub(crate) fn sort(self, recordings: &mut [Recording]) {
        match self {
            SortOrder::NewestFirst => recordings.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            SortOrder::OldestFirst => recordings.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
        }
    }
}
