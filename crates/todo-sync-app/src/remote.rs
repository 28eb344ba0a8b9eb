//! Storage abstraction shared by the sync and mutation layers.

use std::error::Error as StdError;
use std::future::Future;

use futures::StreamExt;
use futures::stream::BoxStream;
use serde_json::Value;
use thiserror::Error;
use todo_sync_core::{Snapshot, TaskId};
use todo_sync_firebase::{FirebaseError, RtdbStore};
use todo_sync_store::{MemoryStore, MemoryStoreError};
use tokio_stream::wrappers::WatchStream;

/// Full-snapshot notifications from a [`RemoteStore`].
pub type SnapshotStream = BoxStream<'static, Result<Snapshot, StoreError>>;

/// Errors surfaced by a [`RemoteStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// The listener could not be registered or failed while running.
    #[error("subscription failed: {0}")]
    Subscription(#[source] Box<dyn StdError + Send + Sync + 'static>),
    /// In-process store failure.
    #[error(transparent)]
    Memory(#[from] MemoryStoreError),
    /// Realtime database failure.
    #[error(transparent)]
    Firebase(#[from] FirebaseError),
}

impl StoreError {
    fn subscription(err: impl StdError + Send + Sync + 'static) -> Self {
        Self::Subscription(Box::new(err))
    }
}

/// Keyed collection the tasks live in.
///
/// Operations mirror what the hosted database offers: generate a key,
/// read or listen for full snapshots, write a record, write one field,
/// remove a record. Writes complete asynchronously; their effect is observed
/// through the subscription.
pub trait RemoteStore: Send + Sync {
    /// Fresh, unique, time-ordered key. `None` when the store cannot produce one.
    fn push_key(&self) -> Option<TaskId>;

    /// Read the current contents once.
    fn fetch(&self) -> impl Future<Output = Result<Snapshot, StoreError>> + Send;

    /// Start listening. The first item is the current contents.
    ///
    /// Dropping the returned stream unregisters the listener.
    fn subscribe(&self) -> impl Future<Output = Result<SnapshotStream, StoreError>> + Send;

    /// Overwrite the record at `key`.
    fn set(&self, key: &str, record: Value) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Overwrite a single field of the record at `key`.
    fn set_field(
        &self,
        key: &str,
        field: &str,
        value: Value,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Remove the record at `key`.
    fn remove(&self, key: &str) -> impl Future<Output = Result<(), StoreError>> + Send;
}

impl RemoteStore for MemoryStore {
    fn push_key(&self) -> Option<TaskId> {
        Self::push_key(self)
    }

    async fn fetch(&self) -> Result<Snapshot, StoreError> {
        Ok(Self::snapshot(self)?)
    }

    async fn subscribe(&self) -> Result<SnapshotStream, StoreError> {
        Ok(WatchStream::new(Self::subscribe(self)).map(Ok).boxed())
    }

    async fn set(&self, key: &str, record: Value) -> Result<(), StoreError> {
        Ok(Self::set(self, key, record)?)
    }

    async fn set_field(&self, key: &str, field: &str, value: Value) -> Result<(), StoreError> {
        Ok(Self::set_field(self, key, field, value)?)
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        Ok(Self::remove(self, key)?)
    }
}

impl RemoteStore for RtdbStore {
    fn push_key(&self) -> Option<TaskId> {
        Self::push_key(self)
    }

    async fn fetch(&self) -> Result<Snapshot, StoreError> {
        Ok(Self::fetch(self).await?)
    }

    async fn subscribe(&self) -> Result<SnapshotStream, StoreError> {
        let stream = Self::subscribe(self).await.map_err(StoreError::subscription)?;
        Ok(stream
            .map(|item| item.map_err(StoreError::subscription))
            .boxed())
    }

    async fn set(&self, key: &str, record: Value) -> Result<(), StoreError> {
        Ok(Self::set(self, key, &record).await?)
    }

    async fn set_field(&self, key: &str, field: &str, value: Value) -> Result<(), StoreError> {
        Ok(Self::set_field(self, key, field, &value).await?)
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        Ok(Self::remove(self, key).await?)
    }
}
