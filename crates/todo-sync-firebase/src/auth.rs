//! Email/password accounts through the Identity Toolkit REST API.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use todo_sync_core::{AuthFailure, Session};
use tracing::{info, warn};

use crate::config::FirebaseConfig;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    id_token: String,
    #[serde(default)]
    email: Option<String>,
    local_id: String,
}

/// Identity Toolkit client.
#[derive(Clone)]
pub struct FirebaseAuth {
    client: Client,
    config: FirebaseConfig,
}

impl FirebaseAuth {
    /// Client for the project described by `config`.
    #[must_use]
    pub fn new(config: FirebaseConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    /// Client sharing an existing connection pool.
    #[must_use]
    pub const fn with_client(client: Client, config: FirebaseConfig) -> Self {
        Self { client, config }
    }

    /// Sign in with an existing account.
    ///
    /// # Errors
    /// Returns the provider's refusal, classified.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthFailure> {
        let session = self.call("signInWithPassword", email, password).await?;
        info!(user = %session.user_id, "Signed in");
        Ok(session)
    }

    /// Create an account and sign it in.
    ///
    /// # Errors
    /// Returns the provider's refusal, classified.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Session, AuthFailure> {
        let session = self.call("signUp", email, password).await?;
        info!(user = %session.user_id, "Registered");
        Ok(session)
    }

    async fn call(&self, action: &str, email: &str, password: &str) -> Result<Session, AuthFailure> {
        let response = self
            .client
            .post(self.config.auth_endpoint(action))
            .query(&[("key", self.config.api_key.as_str())])
            .json(&PasswordRequest {
                email,
                password,
                return_secure_token: true,
            })
            .send()
            .await
            .map_err(|err| AuthFailure::Other(err.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| AuthFailure::Other(err.to_string()))?;
        if !status.is_success() {
            let message = provider_message(&body);
            warn!(%action, status = status.as_u16(), %message, "Auth request refused");
            return Err(classify(&message));
        }

        let account: AccountResponse =
            serde_json::from_str(&body).map_err(|err| AuthFailure::Other(err.to_string()))?;
        Ok(Session {
            email: account.email.unwrap_or_else(|| email.to_owned()),
            user_id: account.local_id,
            id_token: account.id_token,
        })
    }
}

/// Pull `error.message` out of an error body.
fn provider_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .pointer("/error/message")
                .and_then(Value::as_str)
                .map(str::to_owned)
        })
        .unwrap_or_else(|| body.trim().to_owned())
}

/// Map a provider error code to a failure kind.
///
/// Codes may carry a detail after ` : `, e.g.
/// `WEAK_PASSWORD : Password should be at least 6 characters`.
#[must_use]
pub fn classify(message: &str) -> AuthFailure {
    let code = message.split(" : ").next().unwrap_or(message).trim();
    match code {
        "EMAIL_NOT_FOUND" => AuthFailure::NoSuchUser,
        "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" | "INVALID_EMAIL" | "USER_DISABLED" => {
            AuthFailure::InvalidCredentials
        }
        _ => AuthFailure::Other(message.to_owned()),
    }
}
