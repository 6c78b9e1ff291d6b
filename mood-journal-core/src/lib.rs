//! Mood Journal Core Library
//!
//! Diary entries, their local store and their synchronization with the
//! remote diary service.

pub mod identity;
pub mod models;
pub mod remote;
pub mod storage;
pub mod sync;

pub use identity::DeviceIdentity;
pub use models::{DiaryEntry, EntryState, MoodAnswers, MoodError};
pub use remote::{HttpRemoteClient, RemoteClient, RemoteError};
pub use storage::{EntryStorage, StorageError};
pub use sync::{SyncEngine, SyncReport, SyncStatus};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
