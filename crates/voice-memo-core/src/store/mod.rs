//! Recording persistence.
//!
//! The session managers only see [`RecordingRepository`]. The repository is
//! built once at startup and shared as `Arc<dyn RecordingRepository>`.

mod file;
mod memory;

pub use {file::FileRecordingRepository, memory::MemoryRecordingRepository};

use crate::{Recording, SortOrder, StoreResult};

use uuid::Uuid;

/// Storage for persisted recordings.
///
/// Every operation is atomic with respect to other callers in the same
/// process: no caller ever observes a half-written or half-deleted record.
pub trait RecordingRepository: Send + Sync {
    /// All recordings in the requested order.
    fn list(&self, order: SortOrder) -> StoreResult<Vec<Recording>>;

    /// The recording with `id`, if stored.
    fn get(&self, id: Uuid) -> StoreResult<Option<Recording>>;

    /// Stores a new recording.
    ///
    /// Rejects duplicate ids and empty payloads.
    fn create(&self, recording: &Recording) -> StoreResult<()>;

    /// Removes a recording. Returns `false` if no recording had that id.
    fn delete(&self, id: Uuid) -> StoreResult<bool>;

    /// Flushes pending writes to the backing store.
    fn save(&self) -> StoreResult<()>;
}
