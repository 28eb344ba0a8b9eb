//! Sign-in and sign-up flows on top of an [`AuthProvider`].

use std::future::Future;

use thiserror::Error;
use todo_sync_core::{AuthFailure, Session, SignUpForm, SignUpValidation};
use todo_sync_firebase::FirebaseAuth;
use tracing::{info, warn};

/// Hosted email/password authentication.
pub trait AuthProvider: Send + Sync {
    /// Sign in with an existing account.
    fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<Session, AuthFailure>> + Send;

    /// Create an account and sign it in.
    fn sign_up(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<Session, AuthFailure>> + Send;
}

#[cfg(any(test, feature = "test-support"))]
impl AuthProvider for todo_sync_store::MemoryAuth {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthFailure> {
        Self::sign_in(self, email, password)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Session, AuthFailure> {
        Self::sign_up(self, email, password)
    }
}

impl AuthProvider for FirebaseAuth {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthFailure> {
        Self::sign_in(self, email, password).await
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Session, AuthFailure> {
        Self::sign_up(self, email, password).await
    }
}

/// Why a registration did not go through.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SignUpError {
    /// Rejected locally; the provider was not contacted.
    #[error(transparent)]
    Invalid(#[from] SignUpValidation),
    /// Rejected by the provider.
    #[error(transparent)]
    Rejected(AuthFailure),
}

impl SignUpError {
    /// Message shown next to the registration form.
    #[must_use]
    pub fn describe_user_facing(&self) -> String {
        match self {
            Self::Invalid(validation) => validation.to_string(),
            Self::Rejected(failure) => failure.sign_up_message(),
        }
    }
}

/// Login and registration screens' logic.
pub struct AuthService<P> {
    provider: P,
}

impl<P: AuthProvider> AuthService<P> {
    /// Wrap a provider.
    pub const fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Borrow the provider.
    pub const fn provider(&self) -> &P {
        &self.provider
    }

    /// Sign in; the failure's [`AuthFailure::sign_in_message`] is the text to show.
    ///
    /// Empty fields are refused as invalid credentials without a round trip.
    ///
    /// # Errors
    /// Returns the classified provider failure.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthFailure> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AuthFailure::InvalidCredentials);
        }
        match self.provider.sign_in(email.trim(), password).await {
            Ok(session) => {
                info!(user = %session.user_id, "Login succeeded");
                Ok(session)
            }
            Err(failure) => {
                warn!("Login failed: {failure}");
                Err(failure)
            }
        }
    }

    /// Validate the form, then register with the provider.
    ///
    /// # Errors
    /// [`SignUpError::Invalid`] when a local check fails (the provider is not
    /// contacted), [`SignUpError::Rejected`] when the provider refuses.
    pub async fn sign_up(&self, form: &SignUpForm) -> Result<Session, SignUpError> {
        form.validate()?;
        match self.provider.sign_up(form.email.trim(), &form.password).await {
            Ok(session) => {
                info!(user = %session.user_id, "Registration succeeded");
                Ok(session)
            }
            Err(failure) => {
                warn!("Registration failed: {failure}");
                Err(SignUpError::Rejected(failure))
            }
        }
    }
}
