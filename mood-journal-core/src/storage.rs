//! Local persistence of the diary entry collection.

use std::fs;
use std::io;
use std::path::PathBuf;

use crate::models::DiaryEntry;

/// Filename for the persisted entry collection.
const ENTRIES_FILE: &str = "entries.json";

/// Durable storage for the full, ordered entry collection.
///
/// Pure load/save. Saving writes a temporary file and renames it over the
/// previous one, so readers never observe a partial write.
#[derive(Clone, Debug)]
pub struct EntryStorage {
    data_dir: PathBuf,
}

impl EntryStorage {
    /// Creates a new storage instance with a custom data directory.
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    /// Returns the data directory path.
    pub fn data_dir(&self) -> &PathBuf {
        &self.data_dir
    }

    /// Returns the full path of the entries file.
    pub fn path(&self) -> PathBuf {
        self.data_dir.join(ENTRIES_FILE)
    }

    /// Loads all entries.
    ///
    /// A missing, unreadable or corrupt file yields an empty collection.
    pub fn load(&self) -> Vec<DiaryEntry> {
        let path = self.path();

        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read entries");
                return Vec::new();
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Stored entries are corrupt, treating as empty"
                );
                Vec::new()
            }
        }
    }

    /// Replaces the stored collection with `entries`.
    ///
    /// Creates the data directory if it doesn't exist.
    pub fn save(&self, entries: &[DiaryEntry]) -> Result<(), StorageError> {
        fs::create_dir_all(&self.data_dir)
            .map_err(|e| StorageError::IoError(self.data_dir.clone(), e))?;

        let bytes = serde_json::to_vec_pretty(entries).map_err(StorageError::SerializeError)?;

        let path = self.path();
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, bytes).map_err(|e| StorageError::IoError(tmp_path.clone(), e))?;
        fs::rename(&tmp_path, &path).map_err(|e| StorageError::IoError(path, e))?;

        Ok(())
    }
}

/// Errors that can occur while saving entries.
#[derive(Debug)]
pub enum StorageError {
    /// I/O error writing a file.
    IoError(PathBuf, io::Error),
    /// Entries could not be serialized.
    SerializeError(serde_json::Error),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::IoError(path, e) => {
                write!(f, "I/O error for {}: {}", path.display(), e)
            }
            StorageError::SerializeError(e) => write!(f, "Failed to serialize entries: {}", e),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::IoError(_, e) => Some(e),
            StorageError::SerializeError(e) => Some(e),
        }
    }
}
