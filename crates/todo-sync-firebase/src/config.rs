//! Connection settings for the hosted backends.

use serde::{Deserialize, Serialize};

use crate::error::FirebaseError;

/// Default Identity Toolkit endpoint.
pub const DEFAULT_AUTH_URL: &str = "https://identitytoolkit.googleapis.com";
/// Default collection holding the task records.
pub const DEFAULT_COLLECTION: &str = "tasks";

/// Project settings shared by the database and auth clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirebaseConfig {
    /// Realtime database root, e.g. `https://<project>.firebaseio.com`.
    #[serde(default)]
    pub database_url: String,
    /// Web API key of the project.
    #[serde(default)]
    pub api_key: String,
    /// Identity Toolkit base URL.
    #[serde(default = "default_auth_url")]
    pub auth_url: String,
    /// Collection below the database root.
    #[serde(default = "default_collection")]
    pub collection: String,
}

fn default_auth_url() -> String {
    DEFAULT_AUTH_URL.to_owned()
}

fn default_collection() -> String {
    DEFAULT_COLLECTION.to_owned()
}

impl Default for FirebaseConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            api_key: String::new(),
            auth_url: default_auth_url(),
            collection: default_collection(),
        }
    }
}

impl FirebaseConfig {
    /// Settings for a database and auth endpoint, using the default collection.
    #[must_use]
    pub fn new(database_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Check that the settings can reach a project.
    ///
    /// # Errors
    /// Returns [`FirebaseError::Config`] describing the first problem found.
    pub fn validate(&self) -> Result<(), FirebaseError> {
        if self.database_url.trim().is_empty() {
            return Err(FirebaseError::Config("firebase.database_url is not set".into()));
        }
        if !self.database_url.starts_with("http://") && !self.database_url.starts_with("https://") {
            return Err(FirebaseError::Config(format!(
                "firebase.database_url must be an http(s) URL: {}",
                self.database_url
            )));
        }
        if self.api_key.trim().is_empty() {
            return Err(FirebaseError::Config("firebase.api_key is not set".into()));
        }
        self.validate_collection()
    }

    /// Check only the collection name, which must be a single key.
    ///
    /// # Errors
    /// Returns [`FirebaseError::Config`] for empty or nested names.
    pub fn validate_collection(&self) -> Result<(), FirebaseError> {
        validate_segment(&self.collection)
            .map_err(|_| FirebaseError::Config(format!("invalid collection name: {:?}", self.collection)))
    }

    /// URL of the collection without the `.json` suffix.
    #[must_use]
    pub fn collection_url(&self) -> String {
        format!(
            "{}/{}",
            self.database_url.trim().trim_end_matches('/'),
            self.collection
        )
    }

    /// Identity Toolkit URL for an `accounts:<action>` call.
    #[must_use]
    pub fn auth_endpoint(&self, action: &str) -> String {
        format!(
            "{}/v1/accounts:{action}",
            self.auth_url.trim().trim_end_matches('/')
        )
    }
}

/// Reject keys the realtime database would refuse.
pub(crate) fn validate_segment(segment: &str) -> Result<(), FirebaseError> {
    if segment.is_empty()
        || segment.contains(['.', '#', '$', '[', ']', '/'])
        || segment.chars().any(char::is_control)
    {
        return Err(FirebaseError::InvalidKey(segment.to_owned()));
    }
    Ok(())
}
