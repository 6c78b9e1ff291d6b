use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::remote::RemoteError;

/// Observable sync state for status indicators.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStatus {
    /// A sync pass or background upload is running
    pub is_syncing: bool,
    /// Human-readable description of the most recent failure
    pub last_error: Option<String>,
    /// Completion time of the last successful full pass
    pub last_sync: Option<DateTime<Utc>>,
}

/// An entry that could not be pushed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFailure {
    pub id: Uuid,
    pub error: RemoteError,
}

/// Result of `upload_all_pending`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadReport {
    pub uploaded: usize,
    pub failures: Vec<UploadFailure>,
}

/// Result of `download_and_merge`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub pushed: usize,
    pub adopted: usize,
    pub failures: Vec<UploadFailure>,
}

/// Result of `full_sync`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub upload: UploadReport,
    pub merge: MergeReport,
}

impl SyncReport {
    pub fn failures(&self) -> impl Iterator<Item = &UploadFailure> {
        self.upload.failures.iter().chain(self.merge.failures.iter())
    }

    pub fn is_clean(&self) -> bool {
        self.failures().next().is_none()
    }
}
