//! Screen state for the task list: synced tasks, filter mode and mutations.

use std::sync::Arc;

use todo_sync_core::{FilterMode, Task, TaskDraft, TaskList};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::remote::RemoteStore;
use crate::task_sync::TaskSync;
use crate::task_writer::{TaskWriteError, TaskWriter};

/// State owned by one task screen session.
///
/// The task list only changes through the subscription; mutations are
/// dispatched on spawned tasks and their failures are logged, never
/// returned.
pub struct TaskBoard<S> {
    writer: Arc<TaskWriter<S>>,
    sync: TaskSync,
    lists: watch::Receiver<TaskList>,
    filter: FilterMode,
}

impl<S> TaskBoard<S>
where
    S: RemoteStore + Clone + 'static,
{
    /// Subscribe to `store` and show every task.
    pub fn open(store: S) -> Self {
        let sync = TaskSync::start(store.clone());
        let lists = sync.lists();
        Self {
            writer: Arc::new(TaskWriter::new(store)),
            sync,
            lists,
            filter: FilterMode::default(),
        }
    }

    /// Writer shared with the dispatched mutations.
    #[must_use]
    pub fn writer(&self) -> Arc<TaskWriter<S>> {
        Arc::clone(&self.writer)
    }

    /// Current filter mode.
    #[must_use]
    pub const fn filter(&self) -> FilterMode {
        self.filter
    }

    /// Change the filter mode.
    pub const fn set_filter(&mut self, mode: FilterMode) {
        self.filter = mode;
    }

    /// Move to the next filter mode and return it.
    pub const fn cycle_filter(&mut self) -> FilterMode {
        self.filter = self.filter.next();
        self.filter
    }

    /// Every synced task in display order.
    #[must_use]
    pub fn tasks(&self) -> TaskList {
        self.lists.borrow().clone()
    }

    /// Tasks passing the current filter, in display order.
    #[must_use]
    pub fn visible(&self) -> Vec<Task> {
        self.lists.borrow().filtered(self.filter)
    }

    /// Wait for the next list. Returns `false` once the subscription has ended.
    pub async fn changed(&mut self) -> bool {
        self.lists.changed().await.is_ok()
    }

    /// Whether the subscription has ended.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sync.is_finished()
    }

    /// Create a task from `draft`.
    pub fn add(&self, draft: TaskDraft) -> JoinHandle<()> {
        let writer = self.writer();
        tokio::spawn(async move { report("add", writer.add_task(draft).await.map(drop)) })
    }

    /// Overwrite `task` with its edited fields.
    pub fn update(&self, task: Task) -> JoinHandle<()> {
        let writer = self.writer();
        tokio::spawn(async move { report("update", writer.update_task(&task).await) })
    }

    /// Remove `task`.
    pub fn delete(&self, task: Task) -> JoinHandle<()> {
        let writer = self.writer();
        tokio::spawn(async move { report("delete", writer.delete_task(&task).await) })
    }

    /// Flip the completion flag of `task`.
    pub fn toggle(&self, task: Task) -> JoinHandle<()> {
        let writer = self.writer();
        tokio::spawn(async move { report("toggle", writer.toggle_completion(&task).await.map(drop)) })
    }

    /// Leave the screen, unregistering the listener.
    pub fn close(self) {
        self.sync.stop();
    }
}

fn report(action: &str, result: Result<(), TaskWriteError>) {
    if let Err(err) = result {
        warn!(%action, "Task mutation failed: {err}");
    }
}
