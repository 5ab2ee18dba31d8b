use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use super::{FieldUpdate, ProgressRecord, RemoteError, RemoteStore};
use crate::session::Identity;

/// In-process remote store with the same contract as the HTTP one.
///
/// Used for offline runs and tests; individual operations can be made to
/// fail and `fetch` can be slowed down to hold a sync pass in flight.
#[derive(Default)]
pub struct MemoryRemoteStore {
    records: Mutex<HashMap<String, ProgressRecord>>,
    upserts: Mutex<Vec<FieldUpdate>>,
    replace_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
    fail_fetch: AtomicBool,
    fail_replace: AtomicBool,
    fail_upsert: AtomicBool,
    fetch_delay: Mutex<Option<Duration>>,
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(self, user_id: &str, record: ProgressRecord) -> Self {
        self.records
            .lock()
            .unwrap()
            .insert(user_id.to_string(), record);
        self
    }

    pub fn record(&self, user_id: &str) -> Option<ProgressRecord> {
        self.records.lock().unwrap().get(user_id).cloned()
    }

    /// Updates received through `upsert`, in arrival order
    pub fn upserts(&self) -> Vec<FieldUpdate> {
        self.upserts.lock().unwrap().clone()
    }

    pub fn replace_calls(&self) -> usize {
        self.replace_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn set_fail_fetch(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_replace(&self, fail: bool) {
        self.fail_replace.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_upsert(&self, fail: bool) {
        self.fail_upsert.store(fail, Ordering::SeqCst);
    }

    pub fn set_fetch_delay(&self, delay: Option<Duration>) {
        *self.fetch_delay.lock().unwrap() = delay;
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn fetch(&self, identity: &Identity) -> Result<ProgressRecord, RemoteError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.fetch_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable("fetch disabled".to_string()));
        }
        Ok(self.record(&identity.user_id).unwrap_or_default())
    }

    async fn replace(&self, identity: &Identity, record: &ProgressRecord) -> Result<(), RemoteError> {
        self.replace_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_replace.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable("replace disabled".to_string()));
        }
        self.records
            .lock()
            .unwrap()
            .insert(identity.user_id.clone(), record.clone());
        Ok(())
    }

    async fn upsert(&self, identity: &Identity, update: &FieldUpdate) -> Result<(), RemoteError> {
        if self.fail_upsert.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable("upsert disabled".to_string()));
        }

        let mut records = self.records.lock().unwrap();
        let record = records.entry(identity.user_id.clone()).or_default();
        match update {
            FieldUpdate::Read(u) => {
                if u.value {
                    record.read_slugs.insert(u.item_id.clone());
                } else {
                    record.read_slugs.remove(&u.item_id);
                }
            }
            FieldUpdate::Favorite(u) => {
                if u.value {
                    record.fav_slugs.insert(u.item_id.clone());
                } else {
                    record.fav_slugs.remove(&u.item_id);
                }
            }
            FieldUpdate::Opened(u) => {
                record.last_opened_slug = Some(u.item_id.clone());
                record.last_opened_at = Some(u.at.unwrap_or_else(Utc::now));
            }
        }
        drop(records);

        self.upserts.lock().unwrap().push(update.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_identity_reads_empty() {
        let store = MemoryRemoteStore::new();
        let record = store.fetch(&Identity::new("nobody")).await.unwrap();
        assert_eq!(record, ProgressRecord::default());
    }

    #[tokio::test]
    async fn test_upserts_are_idempotent() {
        let store = MemoryRemoteStore::new();
        let me = Identity::new("me");

        store.upsert(&me, &FieldUpdate::read("a", true)).await.unwrap();
        store.upsert(&me, &FieldUpdate::read("a", true)).await.unwrap();
        store.upsert(&me, &FieldUpdate::favorite("b", true)).await.unwrap();
        store.upsert(&me, &FieldUpdate::favorite("b", false)).await.unwrap();

        let record = store.record("me").unwrap();
        assert_eq!(record.read_slugs.len(), 1);
        assert!(record.fav_slugs.is_empty());
        assert_eq!(store.upserts().len(), 4);
    }

    #[tokio::test]
    async fn test_replace_overwrites_without_merging() {
        let mut existing = ProgressRecord::default();
        existing.read_slugs.insert("old".to_string());
        let store = MemoryRemoteStore::new().with_record("me", existing);

        let mut next = ProgressRecord::default();
        next.read_slugs.insert("new".to_string());
        store.replace(&Identity::new("me"), &next).await.unwrap();

        assert_eq!(store.record("me"), Some(next));
    }
}
