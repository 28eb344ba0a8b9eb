//! Keeps an ordered task list in step with the remote collection.

use futures::{Stream, StreamExt};
use todo_sync_core::TaskList;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::remote::{RemoteStore, StoreError};

/// Map every snapshot of `snapshots` to a freshly sorted [`TaskList`].
pub fn task_lists<S>(snapshots: S) -> impl Stream<Item = Result<TaskList, StoreError>>
where
    S: Stream<Item = Result<todo_sync_core::Snapshot, StoreError>>,
{
    snapshots.map(|item| item.map(|snapshot| snapshot.to_task_list()))
}

/// Active subscription publishing the latest [`TaskList`].
///
/// The listener lives in a spawned task owned by this handle. Dropping the
/// handle (or calling [`TaskSync::stop`]) aborts the task, which drops the
/// stream and unregisters the listener.
pub struct TaskSync {
    lists: watch::Receiver<TaskList>,
    handle: JoinHandle<()>,
}

impl TaskSync {
    /// Subscribe to `store` on the current runtime.
    pub fn start<S>(store: S) -> Self
    where
        S: RemoteStore + 'static,
    {
        let (sender, lists) = watch::channel(TaskList::default());
        let handle = tokio::spawn(run(store, sender));
        Self { lists, handle }
    }

    /// Receiver observing every published list.
    #[must_use]
    pub fn lists(&self) -> watch::Receiver<TaskList> {
        self.lists.clone()
    }

    /// Last list received. Empty until the first snapshot arrives.
    #[must_use]
    pub fn current(&self) -> TaskList {
        self.lists.borrow().clone()
    }

    /// Whether the listener task has ended (stream closed or failed to start).
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Unregister the listener.
    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for TaskSync {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn run<S: RemoteStore>(store: S, sender: watch::Sender<TaskList>) {
    let snapshots = match store.subscribe().await {
        Ok(stream) => stream,
        Err(err) => {
            error!("Failed to listen for task changes: {err}");
            return;
        }
    };
    info!("Listening for task changes");

    let mut lists = Box::pin(task_lists(snapshots));
    while let Some(item) = lists.next().await {
        match item {
            Ok(list) => {
                debug!(tasks = list.len(), "Received task list");
                sender.send_replace(list);
            }
            Err(err) => error!("Task subscription error: {err}"),
        }
    }
    info!("Task subscription ended");
}
