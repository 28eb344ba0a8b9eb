use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use time::OffsetDateTime;

use crate::id::TaskId;

/// Field holding the task title.
pub const TITLE_FIELD: &str = "title";
/// Field holding the task description.
pub const DESCRIPTION_FIELD: &str = "description";
/// Field holding the completion flag.
pub const COMPLETED_FIELD: &str = "completed";
/// Field holding the creation timestamp (milliseconds since the Unix epoch).
pub const DATE_FIELD: &str = "date";
/// Field mirroring the collection key inside the record.
pub const ID_FIELD: &str = "id";

/// A to-do item as stored under `tasks/<id>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Collection key; empty until the task is first written.
    #[serde(default)]
    pub id: TaskId,
    /// User-supplied title.
    #[serde(default)]
    pub title: String,
    /// User-supplied description.
    #[serde(default)]
    pub description: String,
    /// Completion flag.
    #[serde(default)]
    pub completed: bool,
    /// Creation time in milliseconds since the Unix epoch.
    pub date: i64,
}

impl Task {
    /// Map one child entry of a collection snapshot into a task.
    ///
    /// Missing fields and fields of the wrong type fall back to their defaults;
    /// a missing `date` becomes `read_at`.
    #[must_use]
    pub fn from_child(key: &str, value: &Value, read_at: i64) -> Self {
        let field = |name: &str| value.as_object().and_then(|map| map.get(name));
        Self {
            id: TaskId::from(key),
            title: field(TITLE_FIELD)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned(),
            description: field(DESCRIPTION_FIELD)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned(),
            completed: field(COMPLETED_FIELD)
                .and_then(Value::as_bool)
                .unwrap_or(false),
            date: field(DATE_FIELD).and_then(millis_from_json).unwrap_or(read_at),
        }
    }

    /// The full record written at `tasks/<id>`.
    #[must_use]
    pub fn to_record(&self) -> Value {
        json!({
            ID_FIELD: self.id.as_str(),
            TITLE_FIELD: self.title,
            DESCRIPTION_FIELD: self.description,
            COMPLETED_FIELD: self.completed,
            DATE_FIELD: self.date,
        })
    }

    /// True once the store assigned a key.
    #[must_use]
    pub const fn is_persisted(&self) -> bool {
        !self.id.is_empty()
    }

    /// Copy with a new title and description; id, date and completion untouched.
    #[must_use]
    pub fn edited(&self, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            ..self.clone()
        }
    }
}

/// User input for a task that has not been written yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    /// Title of the new task.
    pub title: String,
    /// Description of the new task.
    pub description: String,
}

impl TaskDraft {
    /// Build a draft from user input.
    #[must_use]
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }

    /// Stamp the draft with its key and creation time. New tasks start incomplete.
    #[must_use]
    pub fn into_task(self, id: TaskId, date: i64) -> Task {
        Task {
            id,
            title: self.title,
            description: self.description,
            completed: false,
            date,
        }
    }
}

/// Current time in milliseconds since the Unix epoch.
#[must_use]
pub fn now_millis() -> i64 {
    let nanos = OffsetDateTime::now_utc().unix_timestamp_nanos();
    i64::try_from(nanos / 1_000_000).unwrap_or(i64::MAX)
}

#[allow(clippy::cast_possible_truncation)]
fn millis_from_json(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|raw| raw.is_finite() && raw.abs() < 9.0e18)
            .map(|raw| raw.trunc() as i64)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_child_reads_every_field() {
        let value = json!({
            "title": "Buy milk",
            "description": "2 litres",
            "completed": true,
            "date": 1_700_000_000_123_i64,
        });
        let task = Task::from_child("-Nkey", &value, 0);
        assert_eq!(task.id.as_str(), "-Nkey");
        assert_eq!(task.title, "Buy milk");
        assert_eq!(task.description, "2 litres");
        assert!(task.completed);
        assert_eq!(task.date, 1_700_000_000_123);
    }

    #[test]
    fn from_child_applies_defaults_for_missing_fields() {
        let task = Task::from_child("-Nkey", &json!({}), 42);
        assert_eq!(task.title, "");
        assert_eq!(task.description, "");
        assert!(!task.completed);
        assert_eq!(task.date, 42);
    }

    #[test]
    fn from_child_treats_mistyped_fields_as_absent() {
        let value = json!({
            "title": 7,
            "description": null,
            "completed": "yes",
            "date": "yesterday",
        });
        let task = Task::from_child("k", &value, 99);
        assert_eq!(task.title, "");
        assert_eq!(task.description, "");
        assert!(!task.completed);
        assert_eq!(task.date, 99);
    }

    #[test]
    fn from_child_accepts_non_object_values() {
        let task = Task::from_child("k", &json!("scalar"), 5);
        assert_eq!(task.id.as_str(), "k");
        assert_eq!(task.date, 5);
    }

    #[test]
    fn from_child_truncates_float_dates() {
        let task = Task::from_child("k", &json!({ "date": 1_500.9 }), 0);
        assert_eq!(task.date, 1_500);
    }

    #[test]
    fn record_uses_store_field_names() {
        let task = TaskDraft::new("t", "d").into_task(TaskId::from("abc"), 10);
        assert_eq!(
            task.to_record(),
            json!({"id": "abc", "title": "t", "description": "d", "completed": false, "date": 10})
        );
    }

    #[test]
    fn edited_keeps_identity_and_date() {
        let mut task = TaskDraft::new("old", "old desc").into_task(TaskId::from("abc"), 10);
        task.completed = true;
        let edited = task.edited("new", "new desc");
        assert_eq!(edited.id, task.id);
        assert_eq!(edited.date, 10);
        assert!(edited.completed);
        assert_eq!(edited.title, "new");
        assert_eq!(edited.description, "new desc");
    }

    #[test]
    fn now_millis_tracks_the_wall_clock() {
        let now = now_millis();
        // 2020-01-01T00:00:00Z
        assert!(now > 1_577_836_800_000);
        assert!(now_millis() >= now);
    }

    #[test]
    fn drafts_are_not_persisted() {
        let task = TaskDraft::new("t", "").into_task(TaskId::unassigned(), 1);
        assert!(!task.is_persisted());
    }
}
