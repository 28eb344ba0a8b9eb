//! In-process account registry for exercising auth flows in tests.

use std::collections::HashMap;
use std::sync::Mutex;

use todo_sync_core::{AuthFailure, MIN_PASSWORD_LEN, Session};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct Account {
    user_id: String,
    password: String,
}

/// Email/password accounts kept in memory.
///
/// Mirrors the hosted provider's behavior: unknown emails fail with
/// [`AuthFailure::NoSuchUser`], wrong passwords with
/// [`AuthFailure::InvalidCredentials`], duplicate or weak sign-ups with a
/// provider-style message.
#[derive(Debug, Default)]
pub struct MemoryAuth {
    accounts: Mutex<HashMap<String, Account>>,
}

impl MemoryAuth {
    /// Registry without accounts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check credentials and open a session.
    ///
    /// # Errors
    /// Returns the classified failure.
    pub fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthFailure> {
        let accounts = self
            .accounts
            .lock()
            .map_err(|_| AuthFailure::Other("account registry unavailable".into()))?;
        let Some(account) = accounts.get(&normalize(email)) else {
            return Err(AuthFailure::NoSuchUser);
        };
        if account.password != password {
            return Err(AuthFailure::InvalidCredentials);
        }
        Ok(session(email, &account.user_id))
    }

    /// Create an account and open a session for it.
    ///
    /// # Errors
    /// Fails when the email is malformed or taken, or the password is too weak.
    pub fn sign_up(&self, email: &str, password: &str) -> Result<Session, AuthFailure> {
        if !email.contains('@') {
            return Err(AuthFailure::Other("INVALID_EMAIL".into()));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthFailure::Other(
                "WEAK_PASSWORD : Password should be at least 6 characters".into(),
            ));
        }
        let mut accounts = self
            .accounts
            .lock()
            .map_err(|_| AuthFailure::Other("account registry unavailable".into()))?;
        let key = normalize(email);
        if accounts.contains_key(&key) {
            return Err(AuthFailure::Other("EMAIL_EXISTS".into()));
        }
        let user_id = Uuid::new_v4().simple().to_string();
        accounts.insert(
            key,
            Account {
                user_id: user_id.clone(),
                password: password.to_owned(),
            },
        );
        drop(accounts);
        info!(%email, "Registered account");
        Ok(session(email, &user_id))
    }
}

fn normalize(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

fn session(email: &str, user_id: &str) -> Session {
    Session {
        email: email.trim().to_owned(),
        user_id: user_id.to_owned(),
        id_token: format!("memory-{}", Uuid::new_v4().simple()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_up_then_sign_in() {
        let auth = MemoryAuth::new();
        let created = auth
            .sign_up("Alice@Example.com", "secret1")
            .unwrap_or_else(|err| panic!("sign up: {err}"));
        let session = auth
            .sign_in("alice@example.com", "secret1")
            .unwrap_or_else(|err| panic!("sign in: {err}"));
        assert_eq!(created.user_id, session.user_id);
    }

    #[test]
    fn unknown_email_is_no_such_user() {
        let auth = MemoryAuth::new();
        assert_eq!(auth.sign_in("nobody@example.com", "secret1"), Err(AuthFailure::NoSuchUser));
    }

    #[test]
    fn wrong_password_is_invalid_credentials() {
        let auth = MemoryAuth::new();
        let _ = auth.sign_up("bob@example.com", "secret1");
        assert_eq!(
            auth.sign_in("bob@example.com", "secret2"),
            Err(AuthFailure::InvalidCredentials)
        );
    }

    #[test]
    fn duplicate_sign_up_reports_provider_message() {
        let auth = MemoryAuth::new();
        let _ = auth.sign_up("bob@example.com", "secret1");
        assert_eq!(
            auth.sign_up("bob@example.com", "secret1"),
            Err(AuthFailure::Other("EMAIL_EXISTS".into()))
        );
    }
}
