use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::filter::FilterMode;
use crate::id::TaskId;
use crate::task::{Task, now_millis};

/// Full read of the collection: child key to raw JSON value, in key order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    children: BTreeMap<String, Value>,
}

impl Snapshot {
    /// Build a snapshot from already separated children.
    #[must_use]
    pub const fn new(children: BTreeMap<String, Value>) -> Self {
        Self { children }
    }

    /// Interpret the JSON value stored at the collection root.
    ///
    /// `null` (an empty collection) and non-object values yield an empty snapshot.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        value
            .as_object()
            .map_or_else(Self::default, Self::from_map)
    }

    /// Build a snapshot from a JSON object.
    #[must_use]
    pub fn from_map(map: &Map<String, Value>) -> Self {
        Self {
            children: map
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        }
    }

    /// Number of child entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// True when the collection is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Raw value of one child.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.children.get(key)
    }

    /// Iterate children in key order.
    pub fn children(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.children.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Collection contents as a single JSON object.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Object(
            self.children
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        )
    }

    /// Rebuild the ordered task list, stamping missing dates with the current time.
    #[must_use]
    pub fn to_task_list(&self) -> TaskList {
        self.to_task_list_at(now_millis())
    }

    /// Rebuild the ordered task list, stamping missing dates with `read_at`.
    #[must_use]
    pub fn to_task_list_at(&self, read_at: i64) -> TaskList {
        TaskList::from_tasks(
            self.children
                .iter()
                .map(|(key, value)| Task::from_child(key, value, read_at))
                .collect(),
        )
    }
}

/// Display order: completed tasks first, then most recent first.
#[must_use]
pub fn compare_tasks(a: &Task, b: &Task) -> Ordering {
    b.completed
        .cmp(&a.completed)
        .then_with(|| b.date.cmp(&a.date))
}

/// Task list in display order, rebuilt wholesale from every snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskList {
    tasks: Vec<Task>,
}

impl TaskList {
    /// Sort `tasks` into display order. Ties keep their input order.
    #[must_use]
    pub fn from_tasks(mut tasks: Vec<Task>) -> Self {
        tasks.sort_by(compare_tasks);
        Self { tasks }
    }

    /// Borrow the ordered tasks.
    #[must_use]
    pub fn as_slice(&self) -> &[Task] {
        &self.tasks
    }

    /// Iterate tasks in display order.
    pub fn iter(&self) -> std::slice::Iter<'_, Task> {
        self.tasks.iter()
    }

    /// Number of tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// True when there are no tasks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Look up a task by id.
    #[must_use]
    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| &task.id == id)
    }

    /// Tasks visible under `mode`, in display order.
    #[must_use]
    pub fn filtered(&self, mode: FilterMode) -> Vec<Task> {
        mode.apply(&self.tasks)
    }

    /// Consume the list.
    #[must_use]
    pub fn into_vec(self) -> Vec<Task> {
        self.tasks
    }
}

impl<'a> IntoIterator for &'a TaskList {
    type Item = &'a Task;
    type IntoIter = std::slice::Iter<'a, Task>;

    fn into_iter(self) -> Self::IntoIter {
        self.tasks.iter()
    }
}
