use crate::{
    Recording, RecordingSummary, SortOrder, StoreError, StoreResult, store::RecordingRepository,
    sync::lock,
};

use std::{
    fs,
    io::{self, Write},
    panic::Location,
    path::{Path, PathBuf},
    sync::Mutex,
};

use error_location::ErrorLocation;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

const PAYLOAD_EXTENSION: &str = "wav";
const METADATA_EXTENSION: &str = "toml";
const TEMP_SUFFIX: &str = "tmp";

/// Directory-backed repository.
///
/// Each recording is two files: `<id>.wav` holding the payload and
/// `<id>.toml` holding its metadata. The metadata file is written last and
/// removed first, so it marks a complete record; entries without one are
/// ignored by `list`.
#[derive(Debug)]
pub struct FileRecordingRepository {
    root: PathBuf,
    /// Serializes writers within the process.
    write_lock: Mutex<()>,
}

impl FileRecordingRepository {
    /// Opens (creating if needed) a repository rooted at `root`.
    #[track_caller]
    #[instrument(skip(root))]
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();

        fs::create_dir_all(&root).map_err(|e| StoreError::Unavailable {
            reason: format!("Failed to create {:?}: {}", root, e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        info!(root = ?root, "Recording store opened");

        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    /// Directory holding the recordings.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn payload_path(&self, id: Uuid) -> PathBuf {
        self.root.join(format!("{}.{}", id, PAYLOAD_EXTENSION))
    }

    fn metadata_path(&self, id: Uuid) -> PathBuf {
        self.root.join(format!("{}.{}", id, METADATA_EXTENSION))
    }

    #[track_caller]
    fn ensure_root(&self) -> StoreResult<()> {
        if self.root.is_dir() {
            Ok(())
        } else {
            Err(StoreError::Unavailable {
                reason: format!("Store directory {:?} is missing", self.root),
                location: ErrorLocation::from(Location::caller()),
            })
        }
    }

    /// Reads one complete record given its metadata file.
    #[track_caller]
    fn read_record(&self, metadata_path: &Path) -> StoreResult<Recording> {
        let contents = fs::read_to_string(metadata_path).map_err(|e| io_failure(metadata_path, e))?;

        let summary: RecordingSummary = toml::from_str(&contents).map_err(|e| {
            io_failure(
                metadata_path,
                io::Error::new(io::ErrorKind::InvalidData, e.to_string()),
            )
        })?;

        let payload_path = self.payload_path(summary.id);
        let audio_data = fs::read(&payload_path).map_err(|e| io_failure(&payload_path, e))?;

        if audio_data.len() as u64 != summary.payload_len {
            return Err(io_failure(
                &payload_path,
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!(
                        "payload is {} bytes, metadata says {}",
                        audio_data.len(),
                        summary.payload_len
                    ),
                ),
            ));
        }

        Ok(Recording {
            id: summary.id,
            name: summary.name,
            created_at: summary.created_at,
            audio_data,
        })
    }
}

impl RecordingRepository for FileRecordingRepository {
    #[track_caller]
    #[instrument(skip(self))]
    fn list(&self, order: SortOrder) -> StoreResult<Vec<Recording>> {
        self.ensure_root()?;

        let entries = fs::read_dir(&self.root).map_err(|e| io_failure(&self.root, e))?;

        let mut recordings = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| io_failure(&self.root, e))?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(METADATA_EXTENSION) {
                continue;
            }
            match self.read_record(&path) {
                Ok(recording) => recordings.push(recording),
                Err(e) => warn!(path = ?path, error = %e, "Skipping unreadable recording"),
            }
        }

        order.sort(&mut recordings);
        debug!(count = recordings.len(), "Listed recordings");

        Ok(recordings)
    }

    #[track_caller]
    fn get(&self, id: Uuid) -> StoreResult<Option<Recording>> {
        self.ensure_root()?;

        let metadata_path = self.metadata_path(id);
        if !metadata_path.exists() {
            return Ok(None);
        }

        self.read_record(&metadata_path).map(Some)
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

        let _guard = lock(&self.write_lock);
        self.ensure_root()?;

        let metadata_path = self.metadata_path(recording.id);
        if metadata_path.exists() {
            return Err(StoreError::DuplicateId {
                id: recording.id,
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let metadata = toml::to_string_pretty(&recording.summary()).map_err(|e| {
            io_failure(
                &metadata_path,
                io::Error::new(io::ErrorKind::InvalidData, e.to_string()),
            )
        })?;

        let payload_path = self.payload_path(recording.id);
        write_atomic(&payload_path, &recording.audio_data)?;

        if let Err(e) = write_atomic(&metadata_path, metadata.as_bytes()) {
            let _ = fs::remove_file(&payload_path);
            return Err(e);
        }

        info!(
            payload_len = recording.audio_data.len(),
            "Recording persisted"
        );

        Ok(())
    }

    #[track_caller]
    #[instrument(skip(self))]
    fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let _guard = lock(&self.write_lock);
        self.ensure_root()?;

        let metadata_path = self.metadata_path(id);
        let existed = match fs::remove_file(&metadata_path) {
            Ok(()) => true,
            Err(e) if e.kind() == io::ErrorKind::NotFound => false,
            Err(e) => return Err(io_failure(&metadata_path, e)),
        };

        let payload_path = self.payload_path(id);
        match fs::remove_file(&payload_path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = ?payload_path, error = %e, "Orphaned payload left behind"),
        }

        if existed {
            info!("Recording deleted");
        }

        Ok(existed)
    }

    #[track_caller]
    fn save(&self) -> StoreResult<()> {
        self.ensure_root()?;

        // Record files are synced as they are written; the directory entry
        // for each rename still needs a sync on unix.
        #[cfg(unix)]
        fs::File::open(&self.root)
            .and_then(|dir| dir.sync_all())
            .map_err(|e| io_failure(&self.root, e))?;

        Ok(())
    }
}

/// Write to a temp file, sync, then rename over the final path.
#[track_caller]
fn write_atomic(path: &Path, bytes: &[u8]) -> StoreResult<()> {
    let temp_path = path.with_extension(format!(
        "{}.{}",
        path.extension().and_then(|ext| ext.to_str()).unwrap_or_default(),
        TEMP_SUFFIX
    ));

    let mut temp_file = fs::File::create(&temp_path).map_err(|e| io_failure(&temp_path, e))?;
    temp_file
        .write_all(bytes)
        .and_then(|()| temp_file.sync_all())
        .map_err(|e| io_failure(&temp_path, e))?;

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        io_failure(path, e)
    })
}

#[track_caller]
fn io_failure(path: &Path, source: io::Error) -> StoreError {
    StoreError::IoFailure {
        path: path.to_path_buf(),
        source,
        location: ErrorLocation::from(Location::caller()),
    }
}
