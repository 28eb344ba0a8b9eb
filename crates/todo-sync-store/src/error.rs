//! Error types for the in-process store.

use thiserror::Error;

/// Errors that can occur during `MemoryStore` operations.
#[derive(Error, Debug)]
pub enum MemoryStoreError {
    /// Key is empty or contains a character the realtime database forbids.
    #[error("Invalid key: {0:?}")]
    InvalidKey(String),

    /// Partial write against a record that is not a JSON object.
    #[error("Record {0} is not an object")]
    NotAnObject(String),

    /// Failed to acquire the tree lock.
    #[error("Store lock error")]
    LockError,

    /// The data file does not hold a JSON object.
    #[error("Data file {path} must contain a JSON object")]
    InvalidDataFile {
        /// File that was read.
        path: String,
    },

    /// Failed to parse or serialize the data file.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
