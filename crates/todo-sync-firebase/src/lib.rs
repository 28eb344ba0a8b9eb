//! Hosted backends for todo-sync.
//!
//! [`RtdbStore`] talks to a realtime database collection over its REST API
//! and listens for changes through the server-sent events stream.
//! [`FirebaseAuth`] signs users in through the Identity Toolkit.

pub mod auth;
pub mod config;
pub mod error;
pub mod rtdb;
pub mod sse;
pub mod tree;

pub use auth::FirebaseAuth;
pub use config::{DEFAULT_AUTH_URL, DEFAULT_COLLECTION, FirebaseConfig};
pub use error::FirebaseError;
pub use rtdb::{RtdbStore, SnapshotStream};
