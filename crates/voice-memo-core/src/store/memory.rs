use crate::{Recording, SortOrder, StoreError, StoreResult, store::RecordingRepository, sync::lock};

use std::{panic::Location, sync::Mutex};

use error_location::ErrorLocation;
use tracing::{debug, instrument};
use uuid::Uuid;

/// Process-local repository. Contents are lost on exit.
#[derive(Debug, Default)]
pub struct MemoryRecordingRepository {
    recordings: Mutex<Vec<Recording>>,
}

impl MemoryRecordingRepository {
    /// Creates an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a repository pre-filled with `recordings`.
    pub fn with_recordings(recordings: Vec<Recording>) -> Self {
        Self {
            recordings: Mutex::new(recordings),
        }
    }
}

impl RecordingRepository for MemoryRecordingRepository {
    fn list(&self, order: SortOrder) -> StoreResult<Vec<Recording>> {
        let mut recordings = lock(&self.recordings).clone();
        order.sort(&mut recordings);
        Ok(recordings)
    }

    fn get(&self, id: Uuid) -> StoreResult<Option<Recording>> {
        Ok(lock(&self.recordings).iter().find(|r| r.id == id).cloned())
    }

    #[track_caller]
    #[instrument(skip(self, recording), fields(recording_id = %recording.id))]
    fn create(&self, recording: &Recording) -> StoreResult<()> {
        if recording.audio_data.is_empty() {
            return Err(StoreError::EmptyPayload {
                id: recording.id,
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let mut recordings = lock(&self.recordings);
        if recordings.iter().any(|r| r.id == recording.id) {
            return Err(StoreError::DuplicateId {
                id: recording.id,
                location: ErrorLocation::from(Location::caller()),
            });
        }

        recordings.push(recording.clone());
        debug!(count = recordings.len(), "Recording stored in memory");

        Ok(())
    }

    fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let mut recordings = lock(&self.recordings);
        let before = recordings.len();
        recordings.retain(|r| r.id != id);
        Ok(recordings.len() != before)
    }

    fn save(&self) -> StoreResult<()> {
        Ok(())
    }
}
