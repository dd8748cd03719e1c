//! Database access for the store directory.
//!
//! # Database: `storefinder`
//!
//! ## Tables
//!
//! - `users` - Accounts, password hashes, pending password resets
//! - `stores` - Store listings (author is a weak reference to `users`)
//! - `tower_sessions.session` - Tower-sessions storage
//!
//! # Repositories
//!
//! Services never touch the pool directly. They borrow a repository through
//! the [`StoreRepository`] / [`UserRepository`] traits; the `PostgreSQL`
//! implementations are built once at startup and live in
//! [`AppState`](crate::state::AppState).
//!
//! # Migrations
//!
//! Migrations are stored in `crates/web/migrations/` and run via:
//! ```bash
//! cargo run -p storefinder-cli -- migrate
//! ```

pub mod stores;
pub mod users;

#[cfg(test)]
pub mod memory;

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use storefinder_core::{Email, Slug, SlugPattern, StoreId, UserId};

use crate::models::{PasswordReset, ResetToken, Store, StoreDetail, StoreInput, TagCount, User};

pub use stores::PgStoreRepository;
pub use users::PgUserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Persistence for stores.
pub trait StoreRepository: Send + Sync {
    /// All stores, newest first.
    fn list(&self) -> impl Future<Output = Result<Vec<Store>, RepositoryError>> + Send;

    /// Stores carrying `tag`, or every store when `tag` is `None`.
    fn list_by_tag(
        &self,
        tag: Option<&str>,
    ) -> impl Future<Output = Result<Vec<Store>, RepositoryError>> + Send;

    /// Get a store by ID.
    fn get_by_id(
        &self,
        id: StoreId,
    ) -> impl Future<Output = Result<Option<Store>, RepositoryError>> + Send;

    /// Get a store by slug, with its author populated.
    fn get_by_slug(
        &self,
        slug: &str,
    ) -> impl Future<Output = Result<Option<StoreDetail>, RepositoryError>> + Send;

    /// Count stores whose slug matches `pattern` (case-insensitive),
    /// ignoring the store `exclude` if given.
    fn count_slug_collisions(
        &self,
        pattern: &SlugPattern,
        exclude: Option<StoreId>,
    ) -> impl Future<Output = Result<usize, RepositoryError>> + Send;

    /// Insert a new store.
    fn create(
        &self,
        author: UserId,
        slug: &Slug,
        input: &StoreInput,
    ) -> impl Future<Output = Result<Store, RepositoryError>> + Send;

    /// Overwrite the editable fields of a store and return the updated record.
    ///
    /// The photo is only replaced when `input.photo` is set.
    fn update(
        &self,
        id: StoreId,
        slug: &Slug,
        input: &StoreInput,
    ) -> impl Future<Output = Result<Store, RepositoryError>> + Send;

    /// Per-tag store counts, in no particular order.
    fn tag_counts(&self) -> impl Future<Output = Result<Vec<TagCount>, RepositoryError>> + Send;
}

/// Persistence for users and their password resets.
pub trait UserRepository: Send + Sync {
    /// Get a user by ID.
    fn get_by_id(
        &self,
        id: UserId,
    ) -> impl Future<Output = Result<Option<User>, RepositoryError>> + Send;

    /// Get a user by email.
    fn get_by_email(
        &self,
        email: &Email,
    ) -> impl Future<Output = Result<Option<User>, RepositoryError>> + Send;

    /// Get a user together with their password hash.
    fn get_password_hash(
        &self,
        email: &Email,
    ) -> impl Future<Output = Result<Option<(User, String)>, RepositoryError>> + Send;

    /// Create a user. Fails with `Conflict` if the email is taken.
    fn create(
        &self,
        email: &Email,
        name: &str,
        password_hash: &str,
    ) -> impl Future<Output = Result<User, RepositoryError>> + Send;

    /// Change a user's name and email. Fails with `Conflict` if the email is
    /// taken by someone else.
    fn update_profile(
        &self,
        id: UserId,
        email: &Email,
        name: &str,
    ) -> impl Future<Output = Result<User, RepositoryError>> + Send;

    /// Store a pending password reset, replacing any previous one.
    fn set_password_reset(
        &self,
        id: UserId,
        reset: &PasswordReset,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Find the user holding `token`, provided it is unexpired at `now`.
    fn find_by_reset_token(
        &self,
        token: &ResetToken,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<Option<User>, RepositoryError>> + Send;

    /// Consume an unexpired reset token: set the new password hash and clear
    /// the token and expiry in one write.
    ///
    /// Returns `None` when no unexpired token matched, so a token can be
    /// consumed at most once.
    fn complete_password_reset(
        &self,
        token: &ResetToken,
        now: DateTime<Utc>,
        password_hash: &str,
    ) -> impl Future<Output = Result<Option<User>, RepositoryError>> + Send;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Map a unique-violation into `RepositoryError::Conflict`.
fn conflict_on_unique(e: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(e)
}
