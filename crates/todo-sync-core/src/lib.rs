//! Domain types for todo-sync: tasks, push keys, snapshots and filters.

/// Sign-in / sign-up domain types.
pub mod credentials;
/// Derived views over a synced task list.
pub mod filter;
/// Identifier types and push key generation.
pub mod id;
/// Collection snapshots and the ordered task list derived from them.
pub mod snapshot;
/// The task record.
pub mod task;

pub use credentials::{AuthFailure, MIN_PASSWORD_LEN, Session, SignUpForm, SignUpValidation};
pub use filter::{FilterMode, FilterParseError};
pub use id::{PushKeyGenerator, TaskId};
pub use snapshot::{Snapshot, TaskList, compare_tasks};
pub use task::{Task, TaskDraft, now_millis};
