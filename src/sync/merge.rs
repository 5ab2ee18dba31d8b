//! Merge rules for a full sync pass
//!
//! Read and favorite sets merge by union: nothing present on either side is
//! dropped, which also means removals do not propagate. The last-opened
//! pointer is last-write-wins on its timestamp.

use std::collections::BTreeSet;

use crate::progress::{LastOpened, SyncSnapshot};

pub fn merge_sets(a: &BTreeSet<String>, b: &BTreeSet<String>) -> BTreeSet<String> {
    a.union(b).cloned().collect()
}

/// Newer pointer wins; on equal timestamps the local one is kept
pub fn merge_last_opened(
    local: Option<&LastOpened>,
    remote: Option<&LastOpened>,
) -> Option<LastOpened> {
    match (local, remote) {
        (Some(l), Some(r)) if r.at > l.at => Some(r.clone()),
        (Some(l), _) => Some(l.clone()),
        (None, r) => r.cloned(),
    }
}

pub fn merge_snapshots(local: &SyncSnapshot, remote: &SyncSnapshot) -> SyncSnapshot {
    SyncSnapshot {
        read: merge_sets(&local.read, &remote.read),
        favorites: merge_sets(&local.favorites, &remote.favorites),
        last_opened: merge_last_opened(local.last_opened.as_ref(), remote.last_opened.as_ref()),
    }
}
