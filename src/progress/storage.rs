//! Progress flags in the local store
//!
//! The read and favorite sets live in the `progress` namespace under
//! aliased keys so data written by older clients is still picked up.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::models::{LastOpened, ProgressFlags, SyncSnapshot};
use crate::events::Event;
use crate::storage::{AliasTable, LegacyWritePolicy, LocalStore};

pub const PROGRESS_NAMESPACE: &str = "progress";

const READ_KEY: &str = "read";
const FAVORITES_KEY: &str = "favorites";
const LAST_OPENED_KEY: &str = "last_opened";

/// Alias table covering the keys used by earlier clients
pub fn default_aliases(policy: LegacyWritePolicy) -> AliasTable {
    AliasTable::new(policy)
        .with_aliases(READ_KEY, &["read_slugs", "readItems"])
        .with_aliases(FAVORITES_KEY, &["fav_slugs", "favs"])
        .with_aliases(LAST_OPENED_KEY, &["lastOpened"])
}

pub struct ProgressStore {
    store: Arc<LocalStore>,
}

impl ProgressStore {
    pub fn new(store: Arc<LocalStore>) -> Self {
        Self { store }
    }

    fn emit(&self, event: Event) {
        self.store.events().emit(&event);
    }

    pub fn read_set(&self) -> BTreeSet<String> {
        self.store.get_set(PROGRESS_NAMESPACE, READ_KEY)
    }

    pub fn favorite_set(&self) -> BTreeSet<String> {
        self.store.get_set(PROGRESS_NAMESPACE, FAVORITES_KEY)
    }

    /// Newest pointer across all aliases
    pub fn last_opened(&self) -> Option<LastOpened> {
        self.store
            .get_all_aliases::<LastOpened>(PROGRESS_NAMESPACE, LAST_OPENED_KEY)
            .into_iter()
            .max_by_key(|pointer| pointer.at)
    }

    pub fn flags(&self, item_id: &str) -> ProgressFlags {
        ProgressFlags {
            read: self.read_set().contains(item_id),
            favorite: self.favorite_set().contains(item_id),
        }
    }

    fn toggle(&self, key: &str, item_id: &str, value: bool) -> bool {
        let mut set = self.store.get_set(PROGRESS_NAMESPACE, key);
        let changed = if value {
            set.insert(item_id.to_string())
        } else {
            set.remove(item_id)
        };
        if changed {
            self.store.set_set(PROGRESS_NAMESPACE, key, &set);
        }
        changed
    }

    /// Mark an item read or unread. The event fires even when the flag
    /// already had that value so remote copies get re-asserted.
    pub fn set_read(&self, item_id: &str, value: bool) {
        self.toggle(READ_KEY, item_id, value);
        self.emit(Event::ReadToggled {
            item_id: item_id.to_string(),
            value,
        });
    }

    pub fn set_favorite(&self, item_id: &str, value: bool) {
        self.toggle(FAVORITES_KEY, item_id, value);
        self.emit(Event::FavoriteToggled {
            item_id: item_id.to_string(),
            value,
        });
    }

    pub fn mark_opened(&self, item_id: &str, at: DateTime<Utc>) {
        let pointer = LastOpened::new(item_id, at);
        self.store
            .set_aliased(PROGRESS_NAMESPACE, LAST_OPENED_KEY, &pointer);
        self.emit(Event::ItemOpened {
            item_id: item_id.to_string(),
            at,
        });
    }

    pub fn snapshot(&self) -> SyncSnapshot {
        SyncSnapshot {
            read: self.read_set(),
            favorites: self.favorite_set(),
            last_opened: self.last_opened(),
        }
    }

    /// Replace local progress with a merged snapshot. Emits a single
    /// `SnapshotApplied` rather than per-item toggles.
    pub fn apply_snapshot(&self, snapshot: &SyncSnapshot) {
        self.store
            .set_set(PROGRESS_NAMESPACE, READ_KEY, &snapshot.read);
        self.store
            .set_set(PROGRESS_NAMESPACE, FAVORITES_KEY, &snapshot.favorites);
        match &snapshot.last_opened {
            Some(pointer) => {
                self.store
                    .set_aliased(PROGRESS_NAMESPACE, LAST_OPENED_KEY, pointer)
            }
            None => {
                for key in self.store.aliases().physical_keys(LAST_OPENED_KEY) {
                    self.store.remove(PROGRESS_NAMESPACE, &key);
                }
            }
        }
        self.emit(Event::SnapshotApplied);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;
    use std::sync::Mutex;

    fn create_test_store(policy: LegacyWritePolicy) -> (ProgressStore, Arc<LocalStore>, Arc<Mutex<Vec<Event>>>) {
        let events = Arc::new(EventBus::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        events.subscribe(move |e| {
            if !matches!(e, Event::StoreChanged { .. }) {
                sink.lock().unwrap().push(e.clone());
            }
        });
        let store = Arc::new(LocalStore::in_memory(default_aliases(policy), events));
        (ProgressStore::new(Arc::clone(&store)), store, seen)
    }

    fn at(millis: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(millis).unwrap()
    }

    #[test]
    fn test_toggles_update_sets_and_emit() {
        let (progress, _store, seen) = create_test_store(LegacyWritePolicy::Collapse);

        progress.set_read("a", true);
        progress.set_favorite("a", true);
        progress.set_favorite("a", false);

        assert_eq!(
            progress.flags("a"),
            ProgressFlags {
                read: true,
                favorite: false
            }
        );
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                Event::ReadToggled { item_id: "a".into(), value: true },
                Event::FavoriteToggled { item_id: "a".into(), value: true },
                Event::FavoriteToggled { item_id: "a".into(), value: false },
            ]
        );
    }

    #[test]
    fn test_reads_legacy_keys() {
        let (progress, store, _seen) = create_test_store(LegacyWritePolicy::Collapse);
        store.set(PROGRESS_NAMESPACE, "read_slugs", &vec!["old-a"]);
        store.set(PROGRESS_NAMESPACE, "favs", &vec!["old-f"]);
        store.set(PROGRESS_NAMESPACE, "lastOpened", &LastOpened::new("old", at(500)));

        progress.set_read("new", true);

        let snapshot = progress.snapshot();
        assert!(snapshot.read.contains("old-a"));
        assert!(snapshot.read.contains("new"));
        assert!(snapshot.favorites.contains("old-f"));
        assert_eq!(snapshot.last_opened, Some(LastOpened::new("old", at(500))));
    }

    #[test]
    fn test_last_opened_prefers_newest_alias() {
        let (progress, store, _seen) = create_test_store(LegacyWritePolicy::Collapse);
        store.set(PROGRESS_NAMESPACE, "lastOpened", &LastOpened::new("legacy", at(3000)));
        store.set(PROGRESS_NAMESPACE, "last_opened", &LastOpened::new("current", at(1000)));

        assert_eq!(progress.last_opened().unwrap().item_id, "legacy");

        progress.mark_opened("fresh", at(4000));
        assert_eq!(progress.last_opened(), Some(LastOpened::new("fresh", at(4000))));
    }

    #[test]
    fn test_apply_snapshot_emits_once() {
        let (progress, _store, seen) = create_test_store(LegacyWritePolicy::Mirror);
        let snapshot = SyncSnapshot {
            read: ["a", "b"].iter().map(|s| s.to_string()).collect(),
            favorites: ["x"].iter().map(|s| s.to_string()).collect(),
            last_opened: Some(LastOpened::new("a", at(10))),
        };

        progress.apply_snapshot(&snapshot);

        assert_eq!(progress.snapshot(), snapshot);
        assert_eq!(*seen.lock().unwrap(), vec![Event::SnapshotApplied]);
    }
}
