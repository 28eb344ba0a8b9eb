//! Task mutations issued against a [`RemoteStore`].

use serde_json::Value;
use thiserror::Error;
use todo_sync_core::task::COMPLETED_FIELD;
use todo_sync_core::{Task, TaskDraft, now_millis};
use tracing::{error, info};

use crate::remote::{RemoteStore, StoreError};

/// Errors raised by [`TaskWriter`].
#[derive(Debug, Error)]
pub enum TaskWriteError {
    /// The store returned no key for a new task; nothing was written.
    #[error("could not generate a key for the new task")]
    KeyGeneration,
    /// The task has never been persisted.
    #[error("task has no id")]
    MissingId,
    /// Backing store returned an error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Issues one keyed write per operation.
///
/// None of the operations touch local state: their effect shows up through
/// the next snapshot delivered to [`crate::task_sync::TaskSync`].
#[derive(Debug, Clone)]
pub struct TaskWriter<S> {
    store: S,
}

impl<S> TaskWriter<S> {
    /// Construct a new writer.
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Expose a reference to the underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }
}

impl<S: RemoteStore> TaskWriter<S> {
    /// Persist a new task under a fresh push key, stamped with the current time.
    ///
    /// # Errors
    /// [`TaskWriteError::KeyGeneration`] when no key is available, otherwise
    /// the store's write error.
    pub async fn add_task(&self, draft: TaskDraft) -> Result<Task, TaskWriteError> {
        let id = self.store.push_key().ok_or(TaskWriteError::KeyGeneration)?;
        let task = draft.into_task(id, now_millis());
        self.store.set(task.id.as_str(), task.to_record()).await?;
        info!(id = %task.id, "Added task");
        Ok(task)
    }

    /// Overwrite the whole record of `task`, keeping its `date` as supplied.
    ///
    /// # Errors
    /// [`TaskWriteError::MissingId`] for unsaved tasks, otherwise the store's write error.
    pub async fn update_task(&self, task: &Task) -> Result<(), TaskWriteError> {
        ensure_persisted(task)?;
        self.store.set(task.id.as_str(), task.to_record()).await?;
        info!(id = %task.id, "Updated task");
        Ok(())
    }

    /// Remove `task` from the collection.
    ///
    /// # Errors
    /// [`TaskWriteError::MissingId`] for unsaved tasks, otherwise the store's remove error.
    pub async fn delete_task(&self, task: &Task) -> Result<(), TaskWriteError> {
        ensure_persisted(task)?;
        match self.store.remove(task.id.as_str()).await {
            Ok(()) => {
                info!(id = %task.id, "Task deleted");
                Ok(())
            }
            Err(err) => {
                error!(id = %task.id, "Failed to delete task: {err}");
                Err(err.into())
            }
        }
    }

    /// Write the negation of `task.completed` to the `completed` field only.
    ///
    /// The value written is derived from the caller's copy, so two rapid
    /// toggles race and the last write wins. Returns the value written.
    ///
    /// # Errors
    /// [`TaskWriteError::MissingId`] for unsaved tasks, otherwise the store's write error.
    pub async fn toggle_completion(&self, task: &Task) -> Result<bool, TaskWriteError> {
        ensure_persisted(task)?;
        let completed = !task.completed;
        self.store
            .set_field(task.id.as_str(), COMPLETED_FIELD, Value::Bool(completed))
            .await?;
        info!(id = %task.id, completed, "Toggled task");
        Ok(completed)
    }
}

const fn ensure_persisted(task: &Task) -> Result<(), TaskWriteError> {
    if task.is_persisted() {
        Ok(())
    } else {
        Err(TaskWriteError::MissingId)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use todo_sync_core::{Snapshot, TaskId};
    use todo_sync_store::MemoryStore;

    use crate::remote::SnapshotStream;

    fn ok<T, E: std::fmt::Display>(result: Result<T, E>, context: &str) -> T {
        result.unwrap_or_else(|err| panic!("{context}: {err}"))
    }

    fn snapshot(store: &MemoryStore) -> Snapshot {
        ok(store.snapshot(), "snapshot")
    }

    #[tokio::test]
    async fn add_task_writes_full_record_with_fresh_key() {
        let store = MemoryStore::new();
        let writer = TaskWriter::new(store.clone());
        let before = now_millis();

        let task = ok(writer.add_task(TaskDraft::new("Buy milk", "2 litres")).await, "add");

        assert!(task.is_persisted());
        assert!(task.date >= before);
        let list = snapshot(&store).to_task_list();
        assert_eq!(list.len(), 1);
        let stored = list.get(&task.id).expect("stored task");
        assert_eq!(stored.title, "Buy milk");
        assert_eq!(stored.description, "2 litres");
        assert!(!stored.completed);
        assert_eq!(stored.date, task.date);
    }

    #[tokio::test]
    async fn update_overwrites_record_and_keeps_supplied_date() {
        let store = MemoryStore::new();
        let writer = TaskWriter::new(store.clone());
        let task = ok(writer.add_task(TaskDraft::new("a", "b")).await, "add");

        let edited = task.edited("c", "d");
        ok(writer.update_task(&edited).await, "update");

        let stored = snapshot(&store).to_task_list().get(&task.id).cloned().expect("task");
        assert_eq!(stored.title, "c");
        assert_eq!(stored.description, "d");
        assert_eq!(stored.date, task.date);
    }

    #[tokio::test]
    async fn toggle_flips_only_the_completed_field() {
        let store = MemoryStore::new();
        let writer = TaskWriter::new(store.clone());
        let task = ok(writer.add_task(TaskDraft::new("a", "b")).await, "add");
        let before = snapshot(&store).get(task.id.as_str()).cloned().expect("record");

        assert!(ok(writer.toggle_completion(&task).await, "toggle"));

        let mut after = snapshot(&store).get(task.id.as_str()).cloned().expect("record");
        assert_eq!(after[COMPLETED_FIELD], json!(true));
        after[COMPLETED_FIELD] = json!(false);
        assert_eq!(after, before);
    }

    #[tokio::test]
    async fn delete_removes_exactly_one_task() {
        let store = MemoryStore::new();
        let writer = TaskWriter::new(store.clone());
        let keep = ok(writer.add_task(TaskDraft::new("keep", "")).await, "add keep");
        let gone = ok(writer.add_task(TaskDraft::new("gone", "")).await, "add gone");

        ok(writer.delete_task(&gone).await, "delete");

        let list = snapshot(&store).to_task_list();
        assert_eq!(list.len(), 1);
        assert!(list.get(&keep.id).is_some());
        assert!(list.get(&gone.id).is_none());
    }

    #[tokio::test]
    async fn unsaved_tasks_are_rejected_without_writing() {
        let store = MemoryStore::new();
        let writer = TaskWriter::new(store.clone());
        let draft = TaskDraft::new("x", "").into_task(TaskId::unassigned(), 1);

        assert!(matches!(writer.update_task(&draft).await, Err(TaskWriteError::MissingId)));
        assert!(matches!(writer.delete_task(&draft).await, Err(TaskWriteError::MissingId)));
        assert!(matches!(
            writer.toggle_completion(&draft).await,
            Err(TaskWriteError::MissingId)
        ));
        assert!(snapshot(&store).is_empty());
    }

    /// Store that never yields a key and counts write attempts.
    #[derive(Default)]
    struct KeylessStore {
        writes: Arc<AtomicUsize>,
    }

    impl RemoteStore for KeylessStore {
        fn push_key(&self) -> Option<TaskId> {
            None
        }

        async fn fetch(&self) -> Result<Snapshot, StoreError> {
            Ok(Snapshot::default())
        }

        async fn subscribe(&self) -> Result<SnapshotStream, StoreError> {
            Ok(Box::pin(futures::stream::empty()))
        }

        async fn set(&self, _key: &str, _record: Value) -> Result<(), StoreError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn set_field(&self, _key: &str, _field: &str, _value: Value) -> Result<(), StoreError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn remove(&self, _key: &str) -> Result<(), StoreError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn missing_key_aborts_add() {
        let store = KeylessStore::default();
        let writes = Arc::clone(&store.writes);
        let writer = TaskWriter::new(store);

        let result = writer.add_task(TaskDraft::new("x", "")).await;

        assert!(matches!(result, Err(TaskWriteError::KeyGeneration)));
        assert_eq!(writes.load(Ordering::SeqCst), 0);
    }
}
