use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Shortest password accepted by sign-up.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Authenticated user as reported by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Email the user signed in with.
    pub email: String,
    /// Provider-assigned user id.
    pub user_id: String,
    /// Bearer token for the realtime database.
    pub id_token: String,
}

/// Reason a sign-in or sign-up was refused by the provider.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthFailure {
    /// Wrong password or malformed credentials.
    #[error("invalid credentials")]
    InvalidCredentials,
    /// No account exists for the email.
    #[error("no such user")]
    NoSuchUser,
    /// Anything else, with the provider's message.
    #[error("{0}")]
    Other(String),
}

impl AuthFailure {
    /// Message shown next to the login form.
    #[must_use]
    pub fn sign_in_message(&self) -> String {
        match self {
            Self::InvalidCredentials => "Login failed. Please check your credentials.".to_owned(),
            Self::NoSuchUser => "No account found for this email.".to_owned(),
            Self::Other(message) => format!("Login failed: {message}"),
        }
    }

    /// Message shown next to the registration form: the provider's text, verbatim.
    #[must_use]
    pub fn sign_up_message(&self) -> String {
        match self {
            Self::Other(message) if message.trim().is_empty() => "Registration failed.".to_owned(),
            Self::Other(message) => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Local sign-up checks, performed before the provider is contacted.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum SignUpValidation {
    /// Email, password or confirmation is empty.
    #[error("All fields are required.")]
    MissingFields,
    /// Password and confirmation differ.
    #[error("Passwords do not match.")]
    PasswordMismatch,
    /// Password shorter than [`MIN_PASSWORD_LEN`].
    #[error("Password must be at least 6 characters.")]
    PasswordTooShort,
}

/// Registration form contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignUpForm {
    /// Account email.
    pub email: String,
    /// Chosen password.
    pub password: String,
    /// Password typed a second time.
    pub confirmation: String,
}

impl SignUpForm {
    /// Build a form from user input.
    #[must_use]
    pub fn new(
        email: impl Into<String>,
        password: impl Into<String>,
        confirmation: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            confirmation: confirmation.into(),
        }
    }

    /// Run the local checks in form order: emptiness, match, then length.
    ///
    /// # Errors
    /// Returns the first failing check.
    pub fn validate(&self) -> Result<(), SignUpValidation> {
        if self.email.is_empty() || self.password.is_empty() || self.confirmation.is_empty() {
            return Err(SignUpValidation::MissingFields);
        }
        if self.password != self.confirmation {
            return Err(SignUpValidation::PasswordMismatch);
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(SignUpValidation::PasswordTooShort);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_fields_are_reported_first() {
        let form = SignUpForm::new("", "abc", "xyz");
        assert_eq!(form.validate(), Err(SignUpValidation::MissingFields));
        let form = SignUpForm::new("a@b.c", "secret1", "");
        assert_eq!(form.validate(), Err(SignUpValidation::MissingFields));
    }

    #[test]
    fn mismatch_is_reported_before_length() {
        let form = SignUpForm::new("a@b.c", "abc", "abd");
        assert_eq!(form.validate(), Err(SignUpValidation::PasswordMismatch));
    }

    #[test]
    fn short_passwords_are_rejected() {
        let form = SignUpForm::new("a@b.c", "12345", "12345");
        assert_eq!(form.validate(), Err(SignUpValidation::PasswordTooShort));
    }

    #[test]
    fn six_characters_are_enough() {
        let form = SignUpForm::new("a@b.c", "123456", "123456");
        assert_eq!(form.validate(), Ok(()));
    }

    #[test]
    fn validation_messages_match_the_form_text() {
        assert_eq!(SignUpValidation::MissingFields.to_string(), "All fields are required.");
        assert_eq!(SignUpValidation::PasswordMismatch.to_string(), "Passwords do not match.");
        assert_eq!(
            SignUpValidation::PasswordTooShort.to_string(),
            "Password must be at least 6 characters."
        );
    }

    #[test]
    fn sign_in_messages_follow_classification() {
        assert_eq!(
            AuthFailure::InvalidCredentials.sign_in_message(),
            "Login failed. Please check your credentials."
        );
        assert_eq!(
            AuthFailure::NoSuchUser.sign_in_message(),
            "No account found for this email."
        );
        assert_eq!(
            AuthFailure::Other("TOO_MANY_ATTEMPTS_TRY_LATER".into()).sign_in_message(),
            "Login failed: TOO_MANY_ATTEMPTS_TRY_LATER"
        );
    }

    #[test]
    fn sign_up_messages_are_verbatim() {
        assert_eq!(AuthFailure::Other("EMAIL_EXISTS".into()).sign_up_message(), "EMAIL_EXISTS");
        assert_eq!(AuthFailure::Other("  ".into()).sign_up_message(), "Registration failed.");
    }
}
