//! Unified error handling with Sentry integration.
//!
//! Route handlers return `Result<T, AppError>`. Errors the user caused are
//! turned into flash messages by [`recover`]; everything else is captured to
//! Sentry and answered with a generic page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use thiserror::Error;
use tower_sessions::Session;

use crate::db::RepositoryError;
use crate::filters;
use crate::middleware::{FlashKind, Page, push_flashes};
use crate::services::auth::AuthError;
use crate::services::email::EmailError;
use crate::services::images::ImageError;
use crate::services::stores::StoreError;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Store operation failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Photo upload failed.
    #[error("Image error: {0}")]
    Image(#[from] ImageError),

    /// Sending mail failed.
    #[error("Email error: {0}")]
    Email(#[from] EmailError),

    /// Reading or writing the session failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Page shown for unknown routes and missing stores.
#[derive(Template, WebTemplate)]
#[template(path = "not_found.html")]
pub struct NotFoundTemplate {
    pub title: String,
    pub page: Page,
}

impl NotFoundTemplate {
    #[must_use]
    pub fn new(page: Page) -> Self {
        Self {
            title: "Not Found".to_string(),
            page,
        }
    }
}

impl AppError {
    /// Messages to flash back to the user, or `None` if the error is not
    /// something the user can fix.
    #[must_use]
    pub fn user_messages(&self) -> Option<Vec<String>> {
        match self {
            Self::Auth(err) => err.user_messages(),
            Self::Store(StoreError::Validation(err)) => Some(err.messages.clone()),
            Self::Store(StoreError::NotOwner(err)) => Some(vec![err.to_string()]),
            Self::Image(ImageError::Decode(_)) => {
                Some(vec!["That image could not be read.".to_string()])
            }
            Self::Image(err) if err.is_user_facing() => Some(vec![err.to_string()]),
            Self::BadRequest(msg) => Some(vec![msg.clone()]),
            _ => None,
        }
    }

    const fn is_not_found(&self) -> bool {
        matches!(self, Self::Store(StoreError::NotFound))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_not_found() {
            return (
                StatusCode::NOT_FOUND,
                NotFoundTemplate::new(Page::default()),
            )
                .into_response();
        }

        if let Some(messages) = self.user_messages() {
            return (StatusCode::BAD_REQUEST, messages.join("\n")).into_response();
        }

        let event_id = sentry::capture_error(&self);
        tracing::error!(
            error = %self,
            sentry_event_id = %event_id,
            "Request error"
        );

        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Flash a user-facing error and redirect to `back`; pass anything else on.
///
/// # Errors
///
/// Returns the original error when it is not user-facing, or a session error
/// if the flash cannot be stored.
pub async fn recover(session: &Session, err: impl Into<AppError>, back: &str) -> Result<Response> {
    let err = err.into();
    let Some(messages) = err.user_messages() else {
        return Err(err);
    };
    tracing::debug!(error = %err, "Recovered user error");
    push_flashes(session, FlashKind::Error, messages).await?;
    Ok(Redirect::to(back).into_response())
}

/// Set the Sentry user context.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}
