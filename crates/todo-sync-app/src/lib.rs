//! Application layer logic for todo-sync.
//!
//! This crate ties the task model to a storage backend: the subscription
//! that keeps the task list in sync, the mutations, the task board screen
//! state, authentication flows, and configuration shared by the CLI.

pub mod auth;
pub mod board;
pub mod config;
pub mod remote;
pub mod session;
pub mod task_sync;
pub mod task_writer;

// Re-exports for convenience
pub use auth::{AuthProvider, AuthService, SignUpError};
pub use board::TaskBoard;
pub use config::{AppConfig, OfflineConfig};
pub use remote::{RemoteStore, SnapshotStream, StoreError};
pub use session::SessionFile;
pub use task_sync::{TaskSync, task_lists};
pub use task_writer::{TaskWriteError, TaskWriter};
