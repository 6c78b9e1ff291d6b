//! The sync engine: sole owner of the local entry collection.
//!
//! CRUD operations apply to the local collection immediately and schedule a
//! detached upload. Sync passes (`upload_all_pending`, `download_and_merge`,
//! `full_sync`) and background uploads are serialized by a pass lock, so no two
//! of them read-modify-write the collection concurrently.
//!
//! Conflict handling:
//! - create answered with `Conflict` falls back to overwrite;
//! - overwrite answered with `NotFound` falls back to create;
//! - when both fail because the day is held remotely under another id, that
//!   remote id is overwritten with the local content;
//! - during a merge, every remote copy of a day that differs from the local
//!   entry is overwritten, so stale copies left by a moved entry converge.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::merge::{merge_snapshots, sort_newest_first, Push};
use super::status::{MergeReport, SyncReport, SyncStatus, UploadFailure, UploadReport};
use crate::models::DiaryEntry;
use crate::remote::{EntryFields, RemoteClient, RemoteError};
use crate::storage::EntryStorage;

/// Delay between consecutive uploads within one pass.
pub const DEFAULT_UPLOAD_PACING: Duration = Duration::from_millis(500);

/// Reconciles the local collection with the remote service.
///
/// Cheap to clone; clones share the same collection.
#[derive(Clone)]
pub struct SyncEngine {
    inner: Arc<Inner>,
}

struct Inner {
    remote: Arc<dyn RemoteClient>,
    storage: EntryStorage,
    device_id: String,
    entries: Mutex<Vec<DiaryEntry>>,
    pass: tokio::sync::Mutex<()>,
    status: watch::Sender<SyncStatus>,
    pacing: Duration,
}

/// Held for the duration of a pass; `is_syncing` is true while it lives.
struct PassGuard<'a> {
    _lock: tokio::sync::MutexGuard<'a, ()>,
    status: &'a watch::Sender<SyncStatus>,
}

impl PassGuard<'_> {
    fn finish(self, error: Option<String>, completed_sync: bool) {
        self.status.send_modify(|status| {
            status.last_error = error;
            if completed_sync {
                status.last_sync = Some(Utc::now());
            }
        });
    }
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.status.send_modify(|status| status.is_syncing = false);
    }
}

impl SyncEngine {
    /// Creates an engine over the collection persisted in `storage`.
    pub fn new(
        remote: Arc<dyn RemoteClient>,
        storage: EntryStorage,
        device_id: impl Into<String>,
    ) -> Self {
        Self::with_pacing(remote, storage, device_id, DEFAULT_UPLOAD_PACING)
    }

    /// Creates an engine with a custom delay between uploads.
    pub fn with_pacing(
        remote: Arc<dyn RemoteClient>,
        storage: EntryStorage,
        device_id: impl Into<String>,
        pacing: Duration,
    ) -> Self {
        let mut entries = storage.load();
        sort_newest_first(&mut entries);
        entries.dedup_by_key(|e| e.day);

        let (status, _) = watch::channel(SyncStatus::default());

        Self {
            inner: Arc::new(Inner {
                remote,
                storage,
                device_id: device_id.into(),
                entries: Mutex::new(entries),
                pass: tokio::sync::Mutex::new(()),
                status,
                pacing,
            }),
        }
    }

    pub fn device_id(&self) -> &str {
        &self.inner.device_id
    }

    // ========== Read operations ==========

    /// Snapshot of the collection, most recent day first.
    pub fn entries(&self) -> Vec<DiaryEntry> {
        self.lock_entries().clone()
    }

    pub fn entry_for_date(&self, day: NaiveDate) -> Option<DiaryEntry> {
        self.lock_entries().iter().find(|e| e.day == day).cloned()
    }

    pub fn has_entry_for_date(&self, day: NaiveDate) -> bool {
        self.lock_entries().iter().any(|e| e.day == day)
    }

    pub fn pending_count(&self) -> usize {
        self.lock_entries().iter().filter(|e| e.is_pending()).count()
    }

    pub fn status(&self) -> SyncStatus {
        self.inner.status.borrow().clone()
    }

    /// Receiver notified on every status change.
    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.inner.status.subscribe()
    }

    // ========== Local mutations ==========

    /// Adds an entry, replacing the content of any entry on the same day.
    ///
    /// The replaced day keeps its existing id. The entry is stored as pending
    /// and uploaded in the background; the returned handle may be dropped.
    /// Must be called from within a Tokio runtime.
    pub fn add_entry(&self, entry: DiaryEntry) -> JoinHandle<()> {
        let stored = {
            let mut entries = self.lock_entries();
            let mut entry = entry;
            entry.mark_pending();

            if let Some(existing) = entries.iter().find(|e| e.day == entry.day) {
                entry.id = existing.id;
            }
            entries.retain(|e| e.day != entry.day && e.id != entry.id);
            entries.push(entry.clone());
            sort_newest_first(&mut entries);
            self.persist(&entries);
            entry
        };

        tracing::debug!(id = %stored.id, day = %stored.day, "Entry added");
        self.spawn_upload(stored, Upload::Create)
    }

    /// Replaces the entry with the same id. Returns `None` if there is none.
    ///
    /// Moving an entry onto a day held by another entry drops the other one.
    pub fn update_entry(&self, entry: DiaryEntry) -> Option<JoinHandle<()>> {
        let stored = {
            let mut entries = self.lock_entries();
            let pos = entries.iter().position(|e| e.id == entry.id)?;
            let mut entry = entry;
            entry.mark_pending();

            entries[pos] = entry.clone();
            entries.retain(|e| e.id == entry.id || e.day != entry.day);
            sort_newest_first(&mut entries);
            self.persist(&entries);
            entry
        };

        tracing::debug!(id = %stored.id, day = %stored.day, "Entry updated");
        Some(self.spawn_upload(stored, Upload::Update))
    }

    /// Removes the entry locally. The remote copy is left untouched.
    pub fn delete_entry(&self, entry: &DiaryEntry) -> bool {
        let mut entries = self.lock_entries();
        let before = entries.len();
        entries.retain(|e| e.id != entry.id);

        let removed = entries.len() != before;
        if removed {
            self.persist(&entries);
            tracing::debug!(id = %entry.id, day = %entry.day, "Entry deleted locally");
        }
        removed
    }

    // ========== Remote operations ==========

    /// Registers this device with the remote service.
    pub async fn register_device(&self) -> Result<(), RemoteError> {
        let result = self.inner.remote.register_device(self.device_id()).await;
        if let Err(e) = &result {
            tracing::warn!(error = %e, "Device registration failed");
            self.inner
                .status
                .send_modify(|status| status.last_error = Some(e.to_string()));
        }
        result
    }

    /// Creates the entry remotely, overwriting on conflict.
    pub async fn upload_one(&self, entry: &DiaryEntry) -> Result<(), RemoteError> {
        let pass = self.begin_pass().await;
        let result = self.push_and_acknowledge(entry, Upload::Create).await;
        pass.finish(result.as_ref().err().map(ToString::to_string), false);
        result
    }

    /// Overwrites the remote entry, creating it if the service lost it.
    pub async fn update_remote(&self, entry: &DiaryEntry) -> Result<(), RemoteError> {
        let pass = self.begin_pass().await;
        let result = self.push_and_acknowledge(entry, Upload::Update).await;
        pass.finish(result.as_ref().err().map(ToString::to_string), false);
        result
    }

    /// Uploads every pending entry, one at a time.
    ///
    /// A failing entry stays pending and does not stop the loop.
    pub async fn upload_all_pending(&self) -> UploadReport {
        let pass = self.begin_pass().await;
        let report = self.upload_pending_entries().await;
        pass.finish(
            report.failures.first().map(|f| f.error.to_string()),
            false,
        );
        report
    }

    /// Pulls the remote snapshot and merges it into the local collection.
    pub async fn download_and_merge(&self) -> Result<MergeReport, RemoteError> {
        let pass = self.begin_pass().await;
        let result = self.merge_with_remote().await;
        let error = match &result {
            Ok(report) => report.failures.first().map(|f| f.error.to_string()),
            Err(e) => Some(e.to_string()),
        };
        pass.finish(error, result.is_ok());
        result
    }

    /// Uploads pending entries, then downloads and merges.
    ///
    /// Only a failed download is returned as an error; upload failures are
    /// listed in the report.
    pub async fn full_sync(&self) -> Result<SyncReport, RemoteError> {
        let pass = self.begin_pass().await;
        let upload = self.upload_pending_entries().await;
        let merge = self.merge_with_remote().await;

        let error = match &merge {
            Ok(report) => upload
                .failures
                .iter()
                .chain(&report.failures)
                .next()
                .map(|f| f.error.to_string()),
            Err(e) => Some(e.to_string()),
        };
        pass.finish(error, merge.is_ok());

        Ok(SyncReport {
            upload,
            merge: merge?,
        })
    }

    /// Startup sequence: register the device, then run a full sync.
    pub async fn startup(&self) -> Result<SyncReport, RemoteError> {
        self.register_device().await?;
        self.full_sync().await
    }

    // ========== Internals ==========

    fn lock_entries(&self) -> MutexGuard<'_, Vec<DiaryEntry>> {
        self.inner
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, entries: &[DiaryEntry]) {
        if let Err(e) = self.inner.storage.save(entries) {
            tracing::error!(error = %e, "Failed to save entries");
            self.inner
                .status
                .send_modify(|status| status.last_error = Some(e.to_string()));
        }
    }

    async fn begin_pass(&self) -> PassGuard<'_> {
        let lock = self.inner.pass.lock().await;
        self.inner
            .status
            .send_modify(|status| status.is_syncing = true);
        PassGuard {
            _lock: lock,
            status: &self.inner.status,
        }
    }

    async fn pace(&self) {
        if !self.inner.pacing.is_zero() {
            tokio::time::sleep(self.inner.pacing).await;
        }
    }

    fn spawn_upload(&self, entry: DiaryEntry, upload: Upload) -> JoinHandle<()> {
        let engine = self.clone();
        tokio::spawn(async move {
            let pass = engine.begin_pass().await;
            match engine.push_and_acknowledge(&entry, upload).await {
                Ok(()) => pass.finish(None, false),
                Err(e) => {
                    tracing::warn!(
                        id = %entry.id,
                        day = %entry.day,
                        error = %e,
                        "Background upload failed"
                    );
                    pass.finish(Some(e.to_string()), false);
                }
            }
        })
    }

    async fn push_and_acknowledge(
        &self,
        entry: &DiaryEntry,
        upload: Upload,
    ) -> Result<(), RemoteError> {
        match upload {
            Upload::Create => self.push(entry).await?,
            Upload::Update => self.push_update(entry).await?,
        }
        self.acknowledge(std::slice::from_ref(entry));
        Ok(())
    }

    async fn upload_pending_entries(&self) -> UploadReport {
        let pending: Vec<DiaryEntry> = self
            .lock_entries()
            .iter()
            .filter(|e| e.is_pending())
            .cloned()
            .collect();

        let mut report = UploadReport::default();
        for (i, entry) in pending.iter().enumerate() {
            if i > 0 {
                self.pace().await;
            }
            match self.push(entry).await {
                Ok(()) => {
                    self.acknowledge(std::slice::from_ref(entry));
                    report.uploaded += 1;
                }
                Err(error) => {
                    tracing::warn!(id = %entry.id, day = %entry.day, %error, "Upload failed");
                    report.failures.push(UploadFailure {
                        id: entry.id,
                        error,
                    });
                }
            }
        }

        tracing::info!(
            uploaded = report.uploaded,
            failed = report.failures.len(),
            "Pending uploads finished"
        );
        report
    }

    async fn merge_with_remote(&self) -> Result<MergeReport, RemoteError> {
        let remote = self.inner.remote.list_entries(self.device_id()).await?;
        let plan = merge_snapshots(&self.entries(), &remote, Utc::now());

        let mut report = MergeReport {
            adopted: plan.adopted.len(),
            ..Default::default()
        };
        let mut pushed = Vec::new();
        let mut failed = Vec::new();

        for (i, push) in plan.pushes.iter().enumerate() {
            if i > 0 {
                self.pace().await;
            }
            match self.push_over_day(push).await {
                Ok(()) => {
                    pushed.push(push.entry.clone());
                    report.pushed += 1;
                }
                Err(error) => {
                    tracing::warn!(
                        id = %push.entry.id,
                        day = %push.entry.day,
                        %error,
                        "Push failed"
                    );
                    failed.push(push.entry.id);
                    report.failures.push(UploadFailure {
                        id: push.entry.id,
                        error,
                    });
                }
            }
        }

        // Merge again against the current collection so mutations made while
        // the pass was awaiting the network are kept.
        let now = Utc::now();
        let mut entries = self.lock_entries();
        let merged = merge_snapshots(&entries, &remote, now);
        *entries = merged.entries;
        for sent in &pushed {
            if let Some(current) = entries.iter_mut().find(|e| e.same_content(sent)) {
                current.mark_synced(now);
            }
        }
        // The remote is known to differ from these.
        for id in &failed {
            if let Some(current) = entries.iter_mut().find(|e| e.id == *id) {
                current.mark_pending();
            }
        }
        self.persist(&entries);

        tracing::info!(
            pushed = report.pushed,
            adopted = report.adopted,
            failed = report.failures.len(),
            "Merge finished"
        );
        Ok(report)
    }

    /// Marks entries synced if their local content still equals what was sent.
    fn acknowledge(&self, sent: &[DiaryEntry]) {
        let now = Utc::now();
        let mut entries = self.lock_entries();
        let mut changed = false;

        for sent in sent {
            if let Some(current) = entries.iter_mut().find(|e| e.same_content(sent)) {
                current.mark_synced(now);
                changed = true;
            }
        }

        if changed {
            self.persist(&entries);
        }
    }

    /// Writes a merge push: every stale remote copy of the day gets the local
    /// fields. Creates the entry when no copy could be written.
    async fn push_over_day(&self, push: &Push) -> Result<(), RemoteError> {
        let fields = EntryFields::from(&push.entry);
        let mut landed = false;

        for id in &push.overwrite_ids {
            match self
                .inner
                .remote
                .overwrite_entry(*id, &fields, self.device_id())
                .await
            {
                Ok(()) => landed = true,
                Err(RemoteError::NotFound(reason)) => {
                    tracing::debug!(remote_id = %id, %reason, "Stale copy already gone");
                }
                Err(e) => return Err(e),
            }
        }

        if push.write_own || !landed {
            self.push(&push.entry).await?;
        }
        Ok(())
    }

    /// Create, falling back to overwrite on conflict.
    async fn push(&self, entry: &DiaryEntry) -> Result<(), RemoteError> {
        match self
            .inner
            .remote
            .create_entry(entry, self.device_id())
            .await
        {
            Err(RemoteError::Conflict(reason)) => {
                tracing::debug!(
                    id = %entry.id,
                    day = %entry.day,
                    %reason,
                    "Create conflicted, overwriting"
                );
                self.overwrite_day(entry).await
            }
            result => result,
        }
    }

    /// Overwrite, falling back to create when the service has no such id.
    async fn push_update(&self, entry: &DiaryEntry) -> Result<(), RemoteError> {
        let fields = EntryFields::from(entry);
        match self
            .inner
            .remote
            .overwrite_entry(entry.id, &fields, self.device_id())
            .await
        {
            Err(RemoteError::NotFound(reason)) => {
                tracing::debug!(id = %entry.id, %reason, "Overwrite target missing, creating");
                self.push(entry).await
            }
            result => result,
        }
    }

    /// Overwrites whatever the service holds for the entry's day.
    async fn overwrite_day(&self, entry: &DiaryEntry) -> Result<(), RemoteError> {
        let fields = EntryFields::from(entry);
        let device_id = self.device_id();

        match self
            .inner
            .remote
            .overwrite_entry(entry.id, &fields, device_id)
            .await
        {
            Err(RemoteError::NotFound(reason)) => {
                let Some(target) = self.remote_id_for_day(entry).await? else {
                    return Err(RemoteError::NotFound(reason));
                };

                tracing::debug!(
                    id = %entry.id,
                    remote_id = %target,
                    day = %entry.day,
                    "Day held under another id, overwriting it"
                );
                self.inner
                    .remote
                    .overwrite_entry(target, &fields, device_id)
                    .await
            }
            result => result,
        }
    }

    async fn remote_id_for_day(&self, entry: &DiaryEntry) -> Result<Option<Uuid>, RemoteError> {
        let remote = self.inner.remote.list_entries(self.device_id()).await?;
        Ok(remote
            .into_iter()
            .find(|r| r.day == entry.day && r.id != entry.id)
            .map(|r| r.id))
    }
}

#[derive(Debug, Clone, Copy)]
enum Upload {
    Create,
    Update,
}
