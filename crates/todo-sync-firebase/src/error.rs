//! Error types for the Firebase backends.

use thiserror::Error;

/// Errors raised while talking to the realtime database.
#[derive(Error, Debug)]
pub enum FirebaseError {
    /// Transport-level failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("Request failed with status {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Server-provided error text.
        message: String,
    },

    /// Failed to parse or serialize JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Key or path segment rejected before sending.
    #[error("Invalid key: {0:?}")]
    InvalidKey(String),

    /// The server cancelled the listener (usually a security rule change).
    #[error("Listener cancelled by server: {0}")]
    Cancelled(String),

    /// The credential used by the listener expired or was revoked.
    #[error("Listener credential revoked")]
    AuthRevoked,
}

impl FirebaseError {
    /// HTTP status carried by the error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Http(err) => err.status().map(|status| status.as_u16()),
            _ => None,
        }
    }
}
