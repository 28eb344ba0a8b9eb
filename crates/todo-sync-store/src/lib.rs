//! In-process storage implementation for todo-sync.
//!
//! [`MemoryStore`] models the realtime database collection: a keyed tree that
//! publishes a full snapshot after every change. It can be backed by a JSON
//! file so the offline mode survives restarts.

#[cfg(any(test, feature = "test-support"))]
pub mod auth;
pub mod error;

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use todo_sync_core::{PushKeyGenerator, Snapshot, TaskId};
use tokio::sync::watch;
use tracing::{debug, info};

#[cfg(any(test, feature = "test-support"))]
pub use auth::MemoryAuth;
pub use error::MemoryStoreError;

/// Characters the realtime database rejects in keys.
const FORBIDDEN_KEY_CHARS: [char; 6] = ['.', '#', '$', '[', ']', '/'];

/// Keyed collection held in memory, optionally mirrored to a JSON file.
///
/// Cloning is cheap and every clone shares the same tree and subscribers.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

struct Inner {
    tree: Mutex<BTreeMap<String, Value>>,
    keys: Mutex<PushKeyGenerator>,
    changes: watch::Sender<Snapshot>,
    data_file: Option<PathBuf>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty, non-persistent store.
    #[must_use]
    pub fn new() -> Self {
        Self::with_tree(BTreeMap::new(), None)
    }

    /// Open a store mirrored to `path`, loading its contents when the file exists.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or does not hold a JSON object.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, MemoryStoreError> {
        let path = path.as_ref();
        let tree = if path.exists() {
            let contents = fs::read_to_string(path)?;
            if contents.trim().is_empty() {
                BTreeMap::new()
            } else {
                match serde_json::from_str::<Value>(&contents)? {
                    Value::Object(map) => map.into_iter().collect(),
                    Value::Null => BTreeMap::new(),
                    _ => {
                        return Err(MemoryStoreError::InvalidDataFile {
                            path: path.display().to_string(),
                        });
                    }
                }
            }
        } else {
            BTreeMap::new()
        };
        info!(path = %path.display(), tasks = tree.len(), "Opened data file");
        Ok(Self::with_tree(tree, Some(path.to_path_buf())))
    }

    fn with_tree(tree: BTreeMap<String, Value>, data_file: Option<PathBuf>) -> Self {
        let (changes, _) = watch::channel(Snapshot::new(tree.clone()));
        Self {
            inner: Arc::new(Inner {
                tree: Mutex::new(tree),
                keys: Mutex::new(PushKeyGenerator::new()),
                changes,
                data_file,
            }),
        }
    }

    /// Generate a fresh push key. `None` only if the generator lock is poisoned.
    #[must_use]
    pub fn push_key(&self) -> Option<TaskId> {
        self.inner
            .keys
            .lock()
            .ok()
            .map(|mut generator| generator.next_key())
    }

    /// Current collection contents.
    ///
    /// # Errors
    /// Returns an error if the tree lock is poisoned.
    pub fn snapshot(&self) -> Result<Snapshot, MemoryStoreError> {
        let tree = self.inner.tree.lock().map_err(|_| MemoryStoreError::LockError)?;
        Ok(Snapshot::new(tree.clone()))
    }

    /// Receive the current snapshot and every later one.
    ///
    /// Snapshots published faster than the receiver reads are coalesced; the
    /// receiver always observes the latest state. Dropping the receiver
    /// unregisters it.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.inner.changes.subscribe()
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.changes.receiver_count()
    }

    /// Overwrite the record at `key`. Writing `null` removes it.
    ///
    /// # Errors
    /// Returns an error for invalid keys, a poisoned lock, or a failed file write.
    pub fn set(&self, key: &str, value: Value) -> Result<(), MemoryStoreError> {
        validate_key(key)?;
        self.mutate(|tree| {
            if value.is_null() {
                tree.remove(key);
            } else {
                tree.insert(key.to_owned(), value);
            }
            Ok(())
        })?;
        debug!(%key, "Wrote record");
        Ok(())
    }

    /// Overwrite one field of the record at `key`, creating the record if needed.
    /// Writing `null` removes the field; a record left empty disappears.
    ///
    /// # Errors
    /// Returns an error for invalid keys, a non-object record, a poisoned lock,
    /// or a failed file write.
    pub fn set_field(&self, key: &str, field: &str, value: Value) -> Result<(), MemoryStoreError> {
        validate_key(key)?;
        validate_key(field)?;
        self.mutate(|tree| {
            let record = tree
                .entry(key.to_owned())
                .or_insert_with(|| Value::Object(Map::new()));
            let Value::Object(fields) = record else {
                return Err(MemoryStoreError::NotAnObject(key.to_owned()));
            };
            if value.is_null() {
                fields.remove(field);
            } else {
                fields.insert(field.to_owned(), value);
            }
            if fields.is_empty() {
                tree.remove(key);
            }
            Ok(())
        })?;
        debug!(%key, %field, "Wrote field");
        Ok(())
    }

    /// Remove the record at `key`. Removing a missing key succeeds.
    ///
    /// # Errors
    /// Returns an error for invalid keys, a poisoned lock, or a failed file write.
    pub fn remove(&self, key: &str) -> Result<(), MemoryStoreError> {
        validate_key(key)?;
        self.mutate(|tree| {
            tree.remove(key);
            Ok(())
        })?;
        debug!(%key, "Removed record");
        Ok(())
    }

    fn mutate<F>(&self, apply: F) -> Result<(), MemoryStoreError>
    where
        F: FnOnce(&mut BTreeMap<String, Value>) -> Result<(), MemoryStoreError>,
    {
        let snapshot = {
            let mut tree = self.inner.tree.lock().map_err(|_| MemoryStoreError::LockError)?;
            // Staged on a copy so a failed file write leaves the tree untouched.
            let mut next = tree.clone();
            apply(&mut next)?;
            if let Some(path) = &self.inner.data_file {
                persist(path, &next)?;
            }
            *tree = next;
            Snapshot::new(tree.clone())
        };
        self.inner.changes.send_replace(snapshot);
        Ok(())
    }
}

fn validate_key(key: &str) -> Result<(), MemoryStoreError> {
    if key.is_empty() || key.contains(FORBIDDEN_KEY_CHARS) || key.chars().any(char::is_control) {
        return Err(MemoryStoreError::InvalidKey(key.to_owned()));
    }
    Ok(())
}

fn persist(path: &Path, tree: &BTreeMap<String, Value>) -> Result<(), MemoryStoreError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let body = serde_json::to_string_pretty(tree)?;
    let staging = path.with_extension("json.tmp");
    fs::write(&staging, body)?;
    fs::rename(&staging, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ok<T, E: std::fmt::Display>(result: Result<T, E>, context: &str) -> T {
        result.unwrap_or_else(|err| panic!("{context}: {err}"))
    }

    #[test]
    fn set_and_remove_update_the_snapshot() {
        let store = MemoryStore::new();
        ok(store.set("a", json!({"title": "x"})), "set a");
        ok(store.set("b", json!({"title": "y"})), "set b");
        assert_eq!(ok(store.snapshot(), "snapshot").len(), 2);

        ok(store.remove("a"), "remove a");
        let snapshot = ok(store.snapshot(), "snapshot");
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.get("a").is_none());
    }

    #[test]
    fn writing_null_removes_the_record() {
        let store = MemoryStore::new();
        ok(store.set("a", json!({"title": "x"})), "set");
        ok(store.set("a", Value::Null), "set null");
        assert!(ok(store.snapshot(), "snapshot").is_empty());
    }

    #[test]
    fn set_field_touches_only_that_field() {
        let store = MemoryStore::new();
        ok(
            store.set("a", json!({"title": "x", "completed": false, "date": 5})),
            "set",
        );
        ok(store.set_field("a", "completed", json!(true)), "set field");
        let snapshot = ok(store.snapshot(), "snapshot");
        assert_eq!(
            snapshot.get("a"),
            Some(&json!({"title": "x", "completed": true, "date": 5}))
        );
    }

    #[test]
    fn set_field_on_missing_record_creates_it() {
        let store = MemoryStore::new();
        ok(store.set_field("ghost", "completed", json!(true)), "set field");
        let snapshot = ok(store.snapshot(), "snapshot");
        assert_eq!(snapshot.get("ghost"), Some(&json!({"completed": true})));
    }

    #[test]
    fn set_field_rejects_scalar_records() {
        let store = MemoryStore::new();
        ok(store.set("a", json!("scalar")), "set");
        assert!(matches!(
            store.set_field("a", "completed", json!(true)),
            Err(MemoryStoreError::NotAnObject(_))
        ));
    }

    #[test]
    fn invalid_keys_are_rejected() {
        let store = MemoryStore::new();
        for key in ["", "a/b", "a.b", "a#b", "a$b", "a[b", "a]b"] {
            assert!(
                matches!(store.set(key, json!(1)), Err(MemoryStoreError::InvalidKey(_))),
                "{key:?} must be rejected"
            );
        }
    }

    #[test]
    fn push_keys_are_unique_and_ordered() {
        let store = MemoryStore::new();
        let first = store.push_key().unwrap_or_else(|| panic!("key"));
        let second = store.push_key().unwrap_or_else(|| panic!("key"));
        assert!(second > first);
    }

    #[tokio::test]
    async fn subscribers_observe_every_write() {
        let store = MemoryStore::new();
        let mut rx = store.subscribe();
        assert!(rx.borrow_and_update().is_empty());

        ok(store.set("a", json!({"title": "x"})), "set");
        ok(rx.changed().await, "changed");
        assert_eq!(rx.borrow_and_update().len(), 1);
    }

    #[test]
    fn dropping_a_receiver_unregisters_it() {
        let store = MemoryStore::new();
        let rx = store.subscribe();
        assert_eq!(store.subscriber_count(), 1);
        drop(rx);
        assert_eq!(store.subscriber_count(), 0);
    }

    #[test]
    fn open_persists_and_reloads() {
        let dir = ok(tempfile::tempdir(), "tempdir");
        let path = dir.path().join("nested").join("tasks.json");

        let store = ok(MemoryStore::open(&path), "open");
        ok(store.set("a", json!({"title": "x", "date": 1})), "set");
        drop(store);

        let reopened = ok(MemoryStore::open(&path), "reopen");
        let snapshot = ok(reopened.snapshot(), "snapshot");
        assert_eq!(snapshot.get("a"), Some(&json!({"title": "x", "date": 1})));
    }

    #[test]
    fn failed_file_write_leaves_the_tree_unchanged() {
        let dir = ok(tempfile::tempdir(), "tempdir");
        let blocker = dir.path().join("blocker");
        ok(fs::write(&blocker, "not a directory"), "write blocker");

        let store = ok(MemoryStore::open(blocker.join("tasks.json")), "open");
        let rx = store.subscribe();
        assert!(store.set("a", json!({"title": "x"})).is_err());
        assert!(store.set_field("a", "completed", json!(true)).is_err());

        assert!(ok(store.snapshot(), "snapshot").is_empty());
        assert!(!ok(rx.has_changed(), "has_changed"));
        assert!(rx.borrow().is_empty());
    }

    #[test]
    fn open_rejects_non_object_files() {
        let dir = ok(tempfile::tempdir(), "tempdir");
        let path = dir.path().join("tasks.json");
        ok(fs::write(&path, "[1, 2]"), "write");
        assert!(matches!(
            MemoryStore::open(&path),
            Err(MemoryStoreError::InvalidDataFile { .. })
        ));
    }
}
