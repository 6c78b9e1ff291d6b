//! In-memory remote used by the engine tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::DiaryEntry;
use crate::remote::wire::parse_entry_date;
use crate::remote::{EntryFields, RemoteClient, RemoteError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Register,
    Create(Uuid),
    Overwrite(Uuid),
    List,
}

#[derive(Default)]
struct State {
    devices: HashSet<String>,
    entries: HashMap<String, Vec<DiaryEntry>>,
    calls: Vec<Call>,
    failing: HashSet<Uuid>,
    offline: bool,
    fail_list: bool,
}

/// Behaves like the dev server: creates conflict on a known id or day,
/// overwrites of unknown ids are `NotFound`.
#[derive(Default)]
pub struct FakeRemote {
    state: Mutex<State>,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, device_id: &str, entry: DiaryEntry) {
        let mut state = self.state.lock().unwrap();
        state
            .entries
            .entry(device_id.to_string())
            .or_default()
            .push(entry);
    }

    pub fn stored(&self, device_id: &str) -> Vec<DiaryEntry> {
        let state = self.state.lock().unwrap();
        state.entries.get(device_id).cloned().unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn is_registered(&self, device_id: &str) -> bool {
        self.state.lock().unwrap().devices.contains(device_id)
    }

    /// Writes of `id` fail with a transport error.
    pub fn fail_entry(&self, id: Uuid) {
        self.state.lock().unwrap().failing.insert(id);
    }

    pub fn heal_entry(&self, id: Uuid) {
        self.state.lock().unwrap().failing.remove(&id);
    }

    /// Every call fails with a transport error.
    pub fn set_offline(&self, offline: bool) {
        self.state.lock().unwrap().offline = offline;
    }

    /// Listing fails with a server error.
    pub fn set_fail_list(&self, fail: bool) {
        self.state.lock().unwrap().fail_list = fail;
    }

    fn check_online(state: &State) -> Result<(), RemoteError> {
        if state.offline {
            return Err(RemoteError::Transport("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteClient for FakeRemote {
    async fn register_device(&self, device_id: &str) -> Result<(), RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Register);
        Self::check_online(&state)?;
        state.devices.insert(device_id.to_string());
        Ok(())
    }

    async fn create_entry(&self, entry: &DiaryEntry, device_id: &str) -> Result<(), RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Create(entry.id));
        Self::check_online(&state)?;
        if state.failing.contains(&entry.id) {
            return Err(RemoteError::Transport("connection reset".to_string()));
        }

        let stored = state.entries.entry(device_id.to_string()).or_default();
        if stored.iter().any(|e| e.id == entry.id || e.day == entry.day) {
            return Err(RemoteError::Conflict("Entry already exists".to_string()));
        }

        let mut copy = entry.clone();
        copy.mark_pending();
        stored.push(copy);
        Ok(())
    }

    async fn overwrite_entry(
        &self,
        id: Uuid,
        fields: &EntryFields,
        device_id: &str,
    ) -> Result<(), RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Overwrite(id));
        Self::check_online(&state)?;
        if state.failing.contains(&id) {
            return Err(RemoteError::Transport("connection reset".to_string()));
        }

        let day = parse_entry_date(&fields.entry_date)?;
        let stored = state.entries.entry(device_id.to_string()).or_default();
        let Some(target) = stored.iter_mut().find(|e| e.id == id) else {
            return Err(RemoteError::NotFound("Diary entry not found".to_string()));
        };

        target.day = day;
        target.mood_score = fields.mood_score;
        target.mood_percentage = fields.mood_percentage;
        target.activities = fields.activities.clone();
        target.notes = fields.notes.clone();
        Ok(())
    }

    async fn list_entries(&self, device_id: &str) -> Result<Vec<DiaryEntry>, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::List);
        Self::check_online(&state)?;
        if state.fail_list {
            return Err(RemoteError::ServerError("Internal Server Error".to_string()));
        }

        let mut entries = state.entries.get(device_id).cloned().unwrap_or_default();
        entries.sort_by(|a, b| b.day.cmp(&a.day));
        Ok(entries)
    }
}
