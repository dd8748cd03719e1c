//! User management commands.
//!
//! # Usage
//!
//! ```bash
//! storefinder-cli user create -e wes@example.com -n "Wes" -p "a-long-password"
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFINDER_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string

use chrono::TimeDelta;
use thiserror::Error;

use storefinder_core::UserId;
use storefinder_web::config::DEFAULT_RESET_TOKEN_TTL_MS;
use storefinder_web::db::{PgUserRepository, create_pool};
use storefinder_web::services::auth::{AuthError, AuthService, Registration};

/// Errors that can occur during user operations.
#[derive(Debug, Error)]
pub enum UserError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: STOREFINDER_DATABASE_URL")]
    MissingDatabaseUrl,

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// The account could not be created.
    #[error("{0}")]
    Rejected(String),

    /// Anything else from the account service.
    #[error("Account error: {0}")]
    Auth(AuthError),
}

impl From<AuthError> for UserError {
    fn from(err: AuthError) -> Self {
        match err.user_messages() {
            Some(messages) => Self::Rejected(messages.join("; ")),
            None => Self::Auth(err),
        }
    }
}

/// Create a user the same way the register form does.
///
/// # Returns
///
/// The ID of the created user.
///
/// # Errors
///
/// Returns an error if the input fails validation, the email is taken, or
/// the database is unreachable.
pub async fn create_user(email: &str, name: &str, password: &str) -> Result<UserId, UserError> {
    let database_url = super::database_url().ok_or(UserError::MissingDatabaseUrl)?;

    tracing::info!("Connecting to database...");
    let pool = create_pool(&database_url).await?;
    let users = PgUserRepository::new(pool);
    let auth = AuthService::new(
        &users,
        TimeDelta::milliseconds(DEFAULT_RESET_TOKEN_TTL_MS),
    );

    let user = auth
        .register(Registration {
            name,
            email,
            password,
            password_confirm: password,
        })
        .await?;

    tracing::info!(user_id = %user.id, email = %user.email, "User created");
    Ok(user.id)
}
