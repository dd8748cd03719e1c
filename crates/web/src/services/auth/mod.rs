//! Authentication service.
//!
//! Password registration and login, profile updates, and the password reset
//! flow: issue a time-limited token, validate it, consume it exactly once.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, TimeDelta, Utc};

use storefinder_core::{Email, UserId};

use crate::db::{RepositoryError, UserRepository};
use crate::models::{PasswordReset, ResetToken, User};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Fields submitted by the registration form.
#[derive(Debug, Clone, Copy)]
pub struct Registration<'r> {
    pub name: &'r str,
    pub email: &'r str,
    pub password: &'r str,
    pub password_confirm: &'r str,
}

/// Authentication service.
///
/// Borrows the user repository for the duration of a request.
pub struct AuthService<'a, U> {
    users: &'a U,
    reset_ttl: TimeDelta,
}

impl<'a, U: UserRepository> AuthService<'a, U> {
    /// Create a new authentication service.
    ///
    /// `reset_ttl` is how long an issued reset token stays valid.
    #[must_use]
    pub const fn new(users: &'a U, reset_ttl: TimeDelta) -> Self {
        Self { users, reset_ttl }
    }

    // =========================================================================
    // Password Authentication
    // =========================================================================

    /// Register a new user.
    ///
    /// Every failed field check is reported at once.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidRegistration` if any field check fails.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    pub async fn register(&self, form: Registration<'_>) -> Result<User, AuthError> {
        let mut messages = Vec::new();

        let name = form.name.trim();
        if name.is_empty() {
            messages.push("You must supply a name!".to_owned());
        }

        let email = Email::parse(form.email).ok();
        if email.is_none() {
            messages.push("That Email is not valid!".to_owned());
        }

        if form.password.is_empty() {
            messages.push("Password Cannot be Blank!".to_owned());
        } else if let Err(AuthError::WeakPassword(msg)) = validate_password(form.password) {
            messages.push(msg);
        }
        if form.password_confirm.is_empty() {
            messages.push("Confirmed Password cannot be blank!".to_owned());
        }
        if form.password != form.password_confirm {
            messages.push("Oops! Your passwords do not match".to_owned());
        }

        let Some(email) = email.filter(|_| messages.is_empty()) else {
            return Err(AuthError::InvalidRegistration(messages));
        };

        let password_hash = hash_password(form.password)?;

        let user = self
            .users
            .create(&email, name, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .get_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        Ok(user)
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    pub async fn get_user(&self, user_id: UserId) -> Result<User, AuthError> {
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// Change the name and email of an account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidRegistration` if the name is blank.
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::UserAlreadyExists` if another account has the email.
    pub async fn update_account(
        &self,
        user_id: UserId,
        name: &str,
        email: &str,
    ) -> Result<User, AuthError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AuthError::InvalidRegistration(vec![
                "You must supply a name!".to_owned(),
            ]));
        }
        let email = Email::parse(email)?;

        self.users
            .update_profile(user_id, &email, name)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                RepositoryError::NotFound => AuthError::UserNotFound,
                other => AuthError::Repository(other),
            })
    }

    // =========================================================================
    // Password Reset
    // =========================================================================

    /// Issue a reset token for the account registered under `email`.
    ///
    /// Any earlier pending token is replaced. Returns the user together with
    /// the issued reset so the caller can mail the link.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if no account has that email; nothing
    /// is written in that case.
    pub async fn request_password_reset(
        &self,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<(User, PasswordReset), AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::UserNotFound)?;
        let user = self
            .users
            .get_by_email(&email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let reset = PasswordReset::issue(now, self.reset_ttl);
        self.users.set_password_reset(user.id, &reset).await?;

        tracing::info!(user_id = %user.id, expires_at = %reset.expires_at, "Password reset issued");
        Ok((user, reset))
    }

    /// Find the user a reset token belongs to.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidResetToken` if the token is unknown or
    /// expired at `now`. The two cases are not distinguished.
    pub async fn user_for_reset_token(
        &self,
        token: &ResetToken,
        now: DateTime<Utc>,
    ) -> Result<User, AuthError> {
        self.users
            .find_by_reset_token(token, now)
            .await?
            .ok_or(AuthError::InvalidResetToken)
    }

    /// Set a new password through a reset token and clear the token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::PasswordMismatch` if the confirmation differs; this
    /// is checked before the token is looked at.
    /// Returns `AuthError::InvalidResetToken` if the token is unknown, expired,
    /// or was consumed concurrently.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    pub async fn reset_password(
        &self,
        token: &ResetToken,
        password: &str,
        password_confirm: &str,
        now: DateTime<Utc>,
    ) -> Result<User, AuthError> {
        if password != password_confirm {
            return Err(AuthError::PasswordMismatch);
        }

        self.user_for_reset_token(token, now).await?;

        validate_password(password)?;
        let password_hash = hash_password(password)?;

        let user = self
            .users
            .complete_password_reset(token, now, &password_hash)
            .await?
            .ok_or(AuthError::InvalidResetToken)?;

        tracing::info!(user_id = %user.id, "Password reset completed");
        Ok(user)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Validate password requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}
