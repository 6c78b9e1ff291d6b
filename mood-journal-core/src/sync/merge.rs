//! Day-keyed reconciliation of a local and a remote snapshot.
//!
//! Both snapshots are bucketed by `day`. For every day present in either:
//!
//! | local | remote | outcome                                         |
//! |-------|--------|-------------------------------------------------|
//! | yes   | no     | keep local, push it                             |
//! | yes   | yes    | keep local, push it over stale remote copies    |
//! | same  | same   | keep local, marked synced, nothing to push      |
//! | no    | yes    | adopt remote, marked synced                     |
//!
//! "Same" compares the user-visible fields only; a day held remotely under
//! another id but with identical content needs no push. A remote day may hold
//! several entries (an entry moved onto an occupied day); each copy whose
//! fields differ from the local entry is overwritten.
//!
//! The functions here perform no I/O.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::models::DiaryEntry;

/// Why a local entry is pushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushReason {
    /// The remote snapshot has nothing for the day
    LocalOnly,
    /// The remote snapshot holds different content for the day
    LocalWins,
}

/// A local entry that must be written to the remote service.
#[derive(Debug, Clone, PartialEq)]
pub struct Push {
    pub entry: DiaryEntry,
    pub reason: PushReason,
    /// The remote copy under `entry.id` is missing or differs.
    pub write_own: bool,
    /// Other remote ids holding the same day with different content.
    pub overwrite_ids: Vec<Uuid>,
}

/// Result of merging two snapshots.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    /// The merged collection, most recent day first.
    pub entries: Vec<DiaryEntry>,
    /// Local entries to push, most recent day first.
    pub pushes: Vec<Push>,
    /// Days adopted from the remote snapshot.
    pub adopted: Vec<NaiveDate>,
}

/// Merges `local` and `remote` with local-wins on shared days.
///
/// When the local snapshot holds several entries for one day, the first is
/// used. A remote-only day adopts its first remote entry.
pub fn merge_snapshots(
    local: &[DiaryEntry],
    remote: &[DiaryEntry],
    now: DateTime<Utc>,
) -> MergeOutcome {
    let local_by_day = bucket_by_day(local);
    let remote_by_day = group_by_day(remote);

    let days: BTreeSet<NaiveDate> = local_by_day
        .keys()
        .chain(remote_by_day.keys())
        .copied()
        .collect();

    let mut entries = Vec::with_capacity(days.len());
    let mut pushes = Vec::new();
    let mut adopted = Vec::new();

    for day in days.into_iter().rev() {
        let local = local_by_day.get(&day).copied();
        let copies = remote_by_day.get(&day).map(Vec::as_slice).unwrap_or_default();

        match (local, copies.first()) {
            (Some(local), None) => {
                entries.push(local.clone());
                pushes.push(Push {
                    entry: local.clone(),
                    reason: PushReason::LocalOnly,
                    write_own: true,
                    overwrite_ids: Vec::new(),
                });
            }
            (Some(local), Some(_)) => {
                let stale: Vec<&DiaryEntry> = copies
                    .iter()
                    .copied()
                    .filter(|r| !local.same_fields(r))
                    .collect();

                if stale.is_empty() {
                    let mut entry = local.clone();
                    if entry.is_pending() {
                        entry.mark_synced(now);
                    }
                    entries.push(entry);
                    continue;
                }

                entries.push(local.clone());
                pushes.push(Push {
                    entry: local.clone(),
                    reason: PushReason::LocalWins,
                    write_own: stale.iter().any(|r| r.id == local.id),
                    overwrite_ids: stale
                        .iter()
                        .filter(|r| r.id != local.id)
                        .map(|r| r.id)
                        .collect(),
                });
            }
            (None, Some(remote)) => {
                let mut entry = (*remote).clone();
                entry.mark_synced(now);
                entries.push(entry);
                adopted.push(day);
            }
            (None, None) => {}
        }
    }

    MergeOutcome {
        entries,
        pushes,
        adopted,
    }
}

/// Sorts entries most recent day first.
pub fn sort_newest_first(entries: &mut [DiaryEntry]) {
    entries.sort_by(|a, b| b.day.cmp(&a.day));
}

fn bucket_by_day(entries: &[DiaryEntry]) -> BTreeMap<NaiveDate, &DiaryEntry> {
    let mut buckets = BTreeMap::new();
    for entry in entries {
        buckets.entry(entry.day).or_insert(entry);
    }
    buckets
}

fn group_by_day(entries: &[DiaryEntry]) -> BTreeMap<NaiveDate, Vec<&DiaryEntry>> {
    let mut groups: BTreeMap<NaiveDate, Vec<&DiaryEntry>> = BTreeMap::new();
    for entry in entries {
        groups.entry(entry.day).or_default().push(entry);
    }
    groups
}
