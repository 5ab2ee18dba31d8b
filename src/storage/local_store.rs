//! Device-local key/value state
//!
//! Directory structure:
//! ```text
//! {data_dir}/state/
//! └── {namespace}.json   # object of key -> JSON value
//! ```
//!
//! Writes land in the in-memory cache first and are visible immediately.
//! A missing or corrupt namespace file reads as empty. If the directory
//! cannot be created or written, the store keeps working from memory for the
//! rest of the session.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use super::aliases::{AliasTable, LegacyWritePolicy};
use crate::events::{Event, EventBus};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

type Namespace = BTreeMap<String, Value>;

struct StoreInner {
    durable: bool,
    namespaces: HashMap<String, Namespace>,
}

pub struct LocalStore {
    /// `None` for a store that was never backed by disk
    state_dir: Option<PathBuf>,
    aliases: AliasTable,
    events: Arc<EventBus>,
    inner: Mutex<StoreInner>,
}

impl LocalStore {
    /// Open a disk-backed store under `data_dir`
    pub fn open(data_dir: &Path, aliases: AliasTable, events: Arc<EventBus>) -> Self {
        let state_dir = data_dir.join("state");
        let durable = match fs::create_dir_all(&state_dir) {
            Ok(()) => true,
            Err(e) => {
                log::warn!(
                    "Local store: cannot use {}: {} (keeping state in memory only)",
                    state_dir.display(),
                    e
                );
                false
            }
        };

        Self {
            state_dir: Some(state_dir),
            aliases,
            events,
            inner: Mutex::new(StoreInner {
                durable,
                namespaces: HashMap::new(),
            }),
        }
    }

    /// A store that never touches disk
    pub fn in_memory(aliases: AliasTable, events: Arc<EventBus>) -> Self {
        Self {
            state_dir: None,
            aliases,
            events,
            inner: Mutex::new(StoreInner {
                durable: false,
                namespaces: HashMap::new(),
            }),
        }
    }

    /// Whether writes currently reach disk
    pub fn is_durable(&self) -> bool {
        self.inner.lock().unwrap().durable
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    fn namespace_path(&self, namespace: &str) -> Option<PathBuf> {
        self.state_dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.json", namespace)))
    }

    fn read_namespace(path: &Path) -> Result<Namespace> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Get the cached namespace, loading it from disk on first use.
    /// Loading does not depend on `durable`: a failed write stops persisting,
    /// not reading what is already on disk.
    fn namespace<'a>(&self, inner: &'a mut StoreInner, namespace: &str) -> &'a mut Namespace {
        inner
            .namespaces
            .entry(namespace.to_string())
            .or_insert_with(|| match self.namespace_path(namespace) {
                Some(path) if path.exists() => {
                    Self::read_namespace(&path).unwrap_or_else(|e| {
                        log::warn!(
                            "Local store: {} is unreadable ({}), treating as empty",
                            path.display(),
                            e
                        );
                        Namespace::new()
                    })
                }
                _ => Namespace::new(),
            })
    }

    fn persist(&self, inner: &mut StoreInner, namespace: &str) {
        if !inner.durable {
            return;
        }
        let Some(path) = self.namespace_path(namespace) else {
            return;
        };
        let data = match inner.namespaces.get(namespace) {
            Some(ns) => ns,
            None => return,
        };

        let result: Result<()> = serde_json::to_string_pretty(data)
            .map_err(StoreError::from)
            .and_then(|json| fs::write(&path, json).map_err(StoreError::from));

        if let Err(e) = result {
            log::warn!(
                "Local store: failed to write {}: {} (keeping state in memory only)",
                path.display(),
                e
            );
            inner.durable = false;
        }
    }

    fn get_raw(&self, namespace: &str, key: &str) -> Option<Value> {
        let mut inner = self.inner.lock().unwrap();
        self.namespace(&mut inner, namespace).get(key).cloned()
    }

    fn decode<T: DeserializeOwned>(namespace: &str, key: &str, value: Value) -> Option<T> {
        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                log::warn!("Local store: ignoring undecodable {}/{}: {}", namespace, key, e);
                None
            }
        }
    }

    /// Read a value, falling back to the default when missing or undecodable
    pub fn get<T: DeserializeOwned + Default>(&self, namespace: &str, key: &str) -> T {
        self.try_get(namespace, key).unwrap_or_default()
    }

    /// Read a value, `None` when missing or undecodable
    pub fn try_get<T: DeserializeOwned>(&self, namespace: &str, key: &str) -> Option<T> {
        let value = self.get_raw(namespace, key)?;
        Self::decode(namespace, key, value)
    }

    /// Apply `f` to one namespace under the lock, persist, then notify
    fn mutate<F>(&self, namespace: &str, key: &str, f: F)
    where
        F: FnOnce(&mut Namespace),
    {
        {
            let mut inner = self.inner.lock().unwrap();
            f(self.namespace(&mut inner, namespace));
            self.persist(&mut inner, namespace);
        }
        // Lock released: listeners may read the store
        self.events.emit(&Event::StoreChanged {
            namespace: namespace.to_string(),
            key: key.to_string(),
        });
    }

    pub fn set<T: Serialize + ?Sized>(&self, namespace: &str, key: &str, value: &T) {
        let value = match serde_json::to_value(value) {
            Ok(v) => v,
            Err(e) => {
                log::error!("Local store: cannot encode {}/{}: {}", namespace, key, e);
                return;
            }
        };
        self.mutate(namespace, key, |ns| {
            ns.insert(key.to_string(), value);
        });
    }

    pub fn remove(&self, namespace: &str, key: &str) {
        self.mutate(namespace, key, |ns| {
            ns.remove(key);
        });
    }

    pub fn keys(&self, namespace: &str) -> Vec<String> {
        let mut inner = self.inner.lock().unwrap();
        self.namespace(&mut inner, namespace).keys().cloned().collect()
    }

    // ==================== Aliased keys ====================

    /// Decoded values of every alias of `logical` that is present
    pub fn get_all_aliases<T: DeserializeOwned>(&self, namespace: &str, logical: &str) -> Vec<T> {
        self.aliases
            .physical_keys(logical)
            .iter()
            .filter_map(|key| self.try_get(namespace, key))
            .collect()
    }

    /// Write a logical key according to the alias write policy
    pub fn set_aliased<T: Serialize + ?Sized>(&self, namespace: &str, logical: &str, value: &T) {
        let value = match serde_json::to_value(value) {
            Ok(v) => v,
            Err(e) => {
                log::error!("Local store: cannot encode {}/{}: {}", namespace, logical, e);
                return;
            }
        };
        let canonical = logical.to_string();
        let legacy = self.aliases.legacy_keys(logical);
        let policy = self.aliases.policy();

        self.mutate(namespace, logical, |ns| {
            for key in &legacy {
                match policy {
                    LegacyWritePolicy::Mirror => {
                        ns.insert(key.clone(), value.clone());
                    }
                    LegacyWritePolicy::Collapse => {
                        ns.remove(key);
                    }
                }
            }
            ns.insert(canonical, value);
        });
    }

    /// Union of the string sets stored under every alias of `logical`
    pub fn get_set(&self, namespace: &str, logical: &str) -> BTreeSet<String> {
        self.get_all_aliases::<BTreeSet<String>>(namespace, logical)
            .into_iter()
            .flatten()
            .collect()
    }

    pub fn set_set(&self, namespace: &str, logical: &str, value: &BTreeSet<String>) {
        self.set_aliased(namespace, logical, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn aliases(policy: LegacyWritePolicy) -> AliasTable {
        AliasTable::new(policy).with_aliases("read", &["read_slugs", "readItems"])
    }

    fn create_test_store(policy: LegacyWritePolicy) -> (LocalStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalStore::open(temp_dir.path(), aliases(policy), Arc::new(EventBus::new()));
        (store, temp_dir)
    }

    fn set_of(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_set_is_visible_immediately_and_persisted() {
        let (store, temp) = create_test_store(LegacyWritePolicy::Collapse);
        store.set("review", "a", &42u32);
        assert_eq!(store.get::<u32>("review", "a"), 42);
        assert!(store.is_durable());

        let reopened = LocalStore::open(
            temp.path(),
            aliases(LegacyWritePolicy::Collapse),
            Arc::new(EventBus::new()),
        );
        assert_eq!(reopened.get::<u32>("review", "a"), 42);
        assert_eq!(reopened.keys("review"), vec!["a".to_string()]);
    }

    #[test]
    fn test_missing_key_reads_default() {
        let (store, _temp) = create_test_store(LegacyWritePolicy::Collapse);
        assert_eq!(store.get::<u32>("review", "missing"), 0);
        assert!(store.try_get::<u32>("review", "missing").is_none());
        assert!(store.get_set("progress", "read").is_empty());
    }

    #[test]
    fn test_corrupt_file_reads_as_empty() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("state")).unwrap();
        fs::write(temp.path().join("state/progress.json"), "{ not json").unwrap();

        let store = LocalStore::open(
            temp.path(),
            aliases(LegacyWritePolicy::Collapse),
            Arc::new(EventBus::new()),
        );
        assert!(store.get_set("progress", "read").is_empty());

        // The store remains writable and overwrites the corrupt file
        store.set_set("progress", "read", &set_of(&["a"]));
        let content = fs::read_to_string(temp.path().join("state/progress.json")).unwrap();
        assert!(content.contains("\"a\""));
    }

    #[test]
    fn test_undecodable_value_reads_default() {
        let (store, _temp) = create_test_store(LegacyWritePolicy::Collapse);
        store.set("review", "a", "not a number");
        assert_eq!(store.get::<u32>("review", "a"), 0);
    }

    #[test]
    fn test_unusable_directory_degrades_to_memory() {
        let temp = TempDir::new().unwrap();
        // A regular file where the data directory should be
        let blocker = temp.path().join("blocker");
        fs::write(&blocker, "x").unwrap();

        let store = LocalStore::open(
            &blocker,
            aliases(LegacyWritePolicy::Collapse),
            Arc::new(EventBus::new()),
        );
        assert!(!store.is_durable());

        store.set("review", "a", &1u32);
        assert_eq!(store.get::<u32>("review", "a"), 1);
    }

    #[test]
    fn test_failed_write_keeps_reading_from_disk() {
        let temp = TempDir::new().unwrap();
        let state = temp.path().join("state");
        fs::create_dir_all(&state).unwrap();
        fs::write(state.join("progress.json"), r#"{"read":["kept-on-disk"]}"#).unwrap();
        // A directory where the review namespace file should be makes its write fail
        fs::create_dir_all(state.join("review.json")).unwrap();

        let store = LocalStore::open(
            temp.path(),
            aliases(LegacyWritePolicy::Collapse),
            Arc::new(EventBus::new()),
        );
        store.set("review", "a", &1u32);
        assert!(!store.is_durable());
        assert_eq!(store.get::<u32>("review", "a"), 1);

        assert_eq!(store.get_set("progress", "read"), set_of(&["kept-on-disk"]));
    }

    #[test]
    fn test_reads_union_all_aliases() {
        let (store, _temp) = create_test_store(LegacyWritePolicy::Collapse);
        store.set("progress", "read", &set_of(&["a"]));
        store.set("progress", "read_slugs", &set_of(&["b"]));
        store.set("progress", "readItems", &vec!["c", "a"]);

        assert_eq!(store.get_set("progress", "read"), set_of(&["a", "b", "c"]));
    }

    #[test]
    fn test_collapse_policy_migrates_legacy_keys() {
        let (store, _temp) = create_test_store(LegacyWritePolicy::Collapse);
        store.set("progress", "read_slugs", &set_of(&["old"]));

        let merged = store.get_set("progress", "read");
        store.set_set("progress", "read", &merged);

        assert_eq!(store.keys("progress"), vec!["read".to_string()]);
        assert_eq!(store.get_set("progress", "read"), set_of(&["old"]));
    }

    #[test]
    fn test_mirror_policy_fans_out() {
        let (store, _temp) = create_test_store(LegacyWritePolicy::Mirror);
        store.set_set("progress", "read", &set_of(&["a", "b"]));

        for key in ["read", "read_slugs", "readItems"] {
            assert_eq!(store.get::<BTreeSet<String>>("progress", key), set_of(&["a", "b"]));
        }
    }

    #[test]
    fn test_writes_emit_store_changed() {
        let events = Arc::new(EventBus::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        events.subscribe(move |e| sink.lock().unwrap().push(e.clone()));

        let store = LocalStore::in_memory(aliases(LegacyWritePolicy::Collapse), events);
        store.set("review", "a", &1u32);
        store.remove("review", "a");

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(
            seen[0],
            Event::StoreChanged {
                namespace: "review".into(),
                key: "a".into()
            }
        );
    }

    #[test]
    fn test_listener_can_read_store_during_dispatch() {
        let events = Arc::new(EventBus::new());
        let store = Arc::new(LocalStore::in_memory(
            aliases(LegacyWritePolicy::Collapse),
            Arc::clone(&events),
        ));

        let observed = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&observed);
        let reader = Arc::downgrade(&store);
        events.subscribe(move |_| {
            if let Some(store) = reader.upgrade() {
                *sink.lock().unwrap() = store.try_get::<u32>("review", "a");
            }
        });

        store.set("review", "a", &5u32);
        assert_eq!(*observed.lock().unwrap(), Some(5));
    }
}
