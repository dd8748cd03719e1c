//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] storefinder_core::EmailError),

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// No account for the given email.
    #[error("user not found")]
    UserNotFound,

    /// User already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Password and confirmation differ.
    #[error("passwords do not match")]
    PasswordMismatch,

    /// Registration form failed one or more checks.
    #[error("invalid registration: {}", .0.join("; "))]
    InvalidRegistration(Vec<String>),

    /// Reset token unknown, already used, or expired.
    #[error("password reset token is invalid or expired")]
    InvalidResetToken,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

impl AuthError {
    /// Messages safe to show the user, or `None` for server-side failures.
    #[must_use]
    pub fn user_messages(&self) -> Option<Vec<String>> {
        let message = match self {
            Self::InvalidEmail(_) => "That Email is not valid!",
            Self::InvalidCredentials => "Failed Login!",
            Self::UserNotFound => "That email doesn't match our records.",
            Self::UserAlreadyExists => "An account with that email already exists.",
            Self::WeakPassword(msg) => return Some(vec![msg.clone()]),
            Self::PasswordMismatch => "Passwords don't match!",
            Self::InvalidRegistration(messages) => return Some(messages.clone()),
            Self::InvalidResetToken => "Password reset is invalid or expired!",
            Self::Repository(_) | Self::PasswordHash => return None,
        };
        Some(vec![message.to_owned()])
    }
}
