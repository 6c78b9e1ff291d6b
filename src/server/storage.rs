//! Device and diary entry storage for the development server.
//!
//! State lives in memory and, when opened on a data directory, is written as a
//! JSON snapshot after every mutation:
//! ```text
//! <DATA_DIR>/
//!   diary.json
//! ```

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

const SNAPSHOT_FILE: &str = "diary.json";

/// A registered device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub user_id: i64,
    pub device_id: String,
    pub created_at: DateTime<Utc>,
}

/// A stored diary entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryRecord {
    pub entry_id: i64,
    pub user_id: i64,
    pub entry_uuid: String,
    pub entry_date: NaiveDateTime,
    pub mood_score: u32,
    pub mood_percentage: u8,
    pub activities: Option<Vec<String>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields of a new entry.
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub device_id: String,
    pub entry_uuid: String,
    pub entry_date: NaiveDateTime,
    pub mood_score: u32,
    pub mood_percentage: u8,
    pub activities: Option<Vec<String>>,
    pub notes: Option<String>,
}

/// Partial update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct EntryPatch {
    pub entry_date: Option<NaiveDateTime>,
    pub mood_score: Option<u32>,
    pub mood_percentage: Option<u8>,
    pub activities: Option<Vec<String>>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    next_user_id: i64,
    next_entry_id: i64,
    devices: Vec<DeviceRecord>,
    entries: Vec<EntryRecord>,
}

impl Snapshot {
    fn device(&self, device_id: &str) -> Option<&DeviceRecord> {
        self.devices.iter().find(|d| d.device_id == device_id)
    }

    fn user_id(&self, device_id: &str) -> Result<i64, ServerStorageError> {
        self.device(device_id)
            .map(|d| d.user_id)
            .ok_or(ServerStorageError::DeviceNotRegistered)
    }
}

/// Errors that can occur during server storage operations.
#[derive(Debug)]
pub enum ServerStorageError {
    /// The device id was never registered.
    DeviceNotRegistered,
    /// The device already holds the entry uuid or an entry on the same day.
    DuplicateEntry,
    /// No entry with the uuid exists for the device.
    EntryNotFound,
    /// I/O error reading or writing the snapshot.
    IoError(PathBuf, io::Error),
    /// The snapshot could not be encoded or decoded.
    SnapshotError(PathBuf, serde_json::Error),
}

impl std::fmt::Display for ServerStorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerStorageError::DeviceNotRegistered => write!(f, "Device not registered"),
            ServerStorageError::DuplicateEntry => write!(f, "Diary entry already exists"),
            ServerStorageError::EntryNotFound => write!(f, "Diary entry not found"),
            ServerStorageError::IoError(path, e) => {
                write!(f, "I/O error for {}: {}", path.display(), e)
            }
            ServerStorageError::SnapshotError(path, e) => {
                write!(f, "Invalid snapshot {}: {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for ServerStorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServerStorageError::IoError(_, e) => Some(e),
            ServerStorageError::SnapshotError(_, e) => Some(e),
            _ => None,
        }
    }
}

/// Thread-safe store of devices and their diary entries.
#[derive(Debug)]
pub struct ServerStore {
    snapshot_path: Option<PathBuf>,
    state: Mutex<Snapshot>,
}

impl ServerStore {
    /// Creates a store that is never written to disk.
    pub fn in_memory() -> Self {
        Self {
            snapshot_path: None,
            state: Mutex::new(Snapshot::default()),
        }
    }

    /// Opens the snapshot in `data_dir`, creating the directory if needed.
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self, ServerStorageError> {
        let data_dir = data_dir.as_ref();
        fs::create_dir_all(data_dir)
            .map_err(|e| ServerStorageError::IoError(data_dir.to_path_buf(), e))?;

        let path = data_dir.join(SNAPSHOT_FILE);
        let state = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| ServerStorageError::SnapshotError(path.clone(), e))?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Snapshot::default(),
            Err(e) => return Err(ServerStorageError::IoError(path, e)),
        };

        Ok(Self {
            snapshot_path: Some(path),
            state: Mutex::new(state),
        })
    }

    /// Registers a device. Returns the record and whether it was newly created.
    pub fn register_device(
        &self,
        device_id: &str,
    ) -> Result<(DeviceRecord, bool), ServerStorageError> {
        let mut state = self.lock();
        if let Some(existing) = state.device(device_id) {
            return Ok((existing.clone(), false));
        }

        state.next_user_id += 1;
        let record = DeviceRecord {
            user_id: state.next_user_id,
            device_id: device_id.to_string(),
            created_at: Utc::now(),
        };
        state.devices.push(record.clone());
        self.persist(&state)?;

        tracing::info!(device_id, user_id = record.user_id, "Device registered");
        Ok((record, true))
    }

    /// Inserts a new entry for a registered device.
    pub fn create_entry(&self, new: NewEntry) -> Result<EntryRecord, ServerStorageError> {
        let mut state = self.lock();
        let user_id = state.user_id(&new.device_id)?;

        let day = new.entry_date.date();
        let duplicate = state.entries.iter().any(|e| {
            e.user_id == user_id && (e.entry_uuid == new.entry_uuid || e.entry_date.date() == day)
        });
        if duplicate {
            return Err(ServerStorageError::DuplicateEntry);
        }

        state.next_entry_id += 1;
        let now = Utc::now();
        let record = EntryRecord {
            entry_id: state.next_entry_id,
            user_id,
            entry_uuid: new.entry_uuid,
            entry_date: new.entry_date,
            mood_score: new.mood_score,
            mood_percentage: new.mood_percentage,
            activities: new.activities,
            notes: new.notes,
            created_at: now,
            updated_at: now,
        };
        state.entries.push(record.clone());
        self.persist(&state)?;

        tracing::debug!(entry_uuid = %record.entry_uuid, user_id, "Entry created");
        Ok(record)
    }

    /// Entries of a device, most recent `entry_date` first.
    pub fn list_entries(&self, device_id: &str) -> Result<Vec<EntryRecord>, ServerStorageError> {
        let state = self.lock();
        let user_id = state.user_id(device_id)?;

        let mut entries: Vec<EntryRecord> = state
            .entries
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.entry_date.cmp(&a.entry_date));
        Ok(entries)
    }

    /// Applies the provided fields to an existing entry.
    pub fn update_entry(
        &self,
        device_id: &str,
        entry_uuid: &str,
        patch: EntryPatch,
    ) -> Result<EntryRecord, ServerStorageError> {
        let mut state = self.lock();
        let user_id = state.user_id(device_id)?;

        let record = state
            .entries
            .iter_mut()
            .find(|e| e.user_id == user_id && e.entry_uuid == entry_uuid)
            .ok_or(ServerStorageError::EntryNotFound)?;

        if let Some(entry_date) = patch.entry_date {
            record.entry_date = entry_date;
        }
        if let Some(score) = patch.mood_score {
            record.mood_score = score;
        }
        if let Some(pct) = patch.mood_percentage {
            record.mood_percentage = pct;
        }
        if let Some(activities) = patch.activities {
            record.activities = Some(activities);
        }
        if let Some(notes) = patch.notes {
            record.notes = Some(notes);
        }
        record.updated_at = Utc::now();

        let updated = record.clone();
        self.persist(&state)?;

        tracing::debug!(entry_uuid, user_id, "Entry updated");
        Ok(updated)
    }

    fn lock(&self) -> MutexGuard<'_, Snapshot> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Writes the snapshot via a temporary file and rename.
    fn persist(&self, state: &Snapshot) -> Result<(), ServerStorageError> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };

        let json = serde_json::to_vec_pretty(state)
            .map_err(|e| ServerStorageError::SnapshotError(path.clone(), e))?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| ServerStorageError::IoError(tmp.clone(), e))?;
        fs::rename(&tmp, path).map_err(|e| ServerStorageError::IoError(path.clone(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn at(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn new_entry(device_id: &str, uuid: &str, date: NaiveDateTime) -> NewEntry {
        NewEntry {
            device_id: device_id.to_string(),
            entry_uuid: uuid.to_string(),
            entry_date: date,
            mood_score: 12,
            mood_percentage: 60,
            activities: None,
            notes: None,
        }
    }

    #[test]
    fn test_register_is_idempotent() {
        let store = ServerStore::in_memory();
        let (first, created) = store.register_device("dev").unwrap();
        assert!(created);

        let (second, created) = store.register_device("dev").unwrap();
        assert!(!created);
        assert_eq!(first.user_id, second.user_id);
    }

    #[test]
    fn test_create_requires_registration() {
        let store = ServerStore::in_memory();
        let result = store.create_entry(new_entry("ghost", "a", at(1, 0)));
        assert!(matches!(
            result,
            Err(ServerStorageError::DeviceNotRegistered)
        ));
    }

    #[test]
    fn test_create_rejects_same_uuid_or_day() {
        let store = ServerStore::in_memory();
        store.register_device("dev").unwrap();
        store.create_entry(new_entry("dev", "a", at(1, 0))).unwrap();

        assert!(matches!(
            store.create_entry(new_entry("dev", "a", at(2, 0))),
            Err(ServerStorageError::DuplicateEntry)
        ));
        assert!(matches!(
            store.create_entry(new_entry("dev", "b", at(1, 15))),
            Err(ServerStorageError::DuplicateEntry)
        ));
    }

    #[test]
    fn test_devices_are_isolated() {
        let store = ServerStore::in_memory();
        store.register_device("one").unwrap();
        store.register_device("two").unwrap();
        store.create_entry(new_entry("one", "a", at(1, 0))).unwrap();
        store.create_entry(new_entry("two", "a", at(1, 0))).unwrap();

        assert_eq!(store.list_entries("one").unwrap().len(), 1);
        assert!(matches!(
            store.update_entry("two", "missing", EntryPatch::default()),
            Err(ServerStorageError::EntryNotFound)
        ));
    }

    #[test]
    fn test_list_is_newest_first() {
        let store = ServerStore::in_memory();
        store.register_device("dev").unwrap();
        store.create_entry(new_entry("dev", "a", at(1, 0))).unwrap();
        store.create_entry(new_entry("dev", "c", at(3, 0))).unwrap();
        store.create_entry(new_entry("dev", "b", at(2, 0))).unwrap();

        let uuids: Vec<String> = store
            .list_entries("dev")
            .unwrap()
            .into_iter()
            .map(|e| e.entry_uuid)
            .collect();
        assert_eq!(uuids, vec!["c", "b", "a"]);
    }

    #[test]
    fn test_partial_update() {
        let store = ServerStore::in_memory();
        store.register_device("dev").unwrap();
        let mut new = new_entry("dev", "a", at(1, 0));
        new.notes = Some("original".to_string());
        store.create_entry(new).unwrap();

        let updated = store
            .update_entry(
                "dev",
                "a",
                EntryPatch {
                    mood_percentage: Some(95),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.mood_percentage, 95);
        assert_eq!(updated.mood_score, 12);
        assert_eq!(updated.notes.as_deref(), Some("original"));
        assert!(updated.updated_at >= updated.created_at);
    }

    #[test]
    fn test_snapshot_survives_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = ServerStore::open(dir.path()).unwrap();
            store.register_device("dev").unwrap();
            store.create_entry(new_entry("dev", "a", at(1, 0))).unwrap();
        }

        let store = ServerStore::open(dir.path()).unwrap();
        assert_eq!(store.list_entries("dev").unwrap().len(), 1);
        let (record, created) = store.register_device("other").unwrap();
        assert!(created);
        assert_eq!(record.user_id, 2);
        assert!(!dir.path().join("diary.json.tmp").exists());
    }

    #[test]
    fn test_corrupt_snapshot_is_an_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(SNAPSHOT_FILE), "not json").unwrap();

        assert!(matches!(
            ServerStore::open(dir.path()),
            Err(ServerStorageError::SnapshotError(_, _))
        ));
    }
}
