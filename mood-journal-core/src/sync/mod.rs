//! Reconciliation of the local collection with the remote service.
//!
//! The local collection is authoritative. Entries are pushed as they change
//! and whenever a pass finds them pending; the remote snapshot only fills in
//! days the device does not hold.

mod engine;
mod merge;
mod status;

#[cfg(test)]
mod fake;

pub use engine::{SyncEngine, DEFAULT_UPLOAD_PACING};
pub use merge::{merge_snapshots, sort_newest_first, MergeOutcome, Push, PushReason};
pub use status::{MergeReport, SyncReport, SyncStatus, UploadFailure, UploadReport};
