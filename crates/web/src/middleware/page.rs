//! Per-request page context for templates.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use super::flash::{FlashMessage, take_flashes};
use crate::models::{CurrentUser, session_keys};

/// What every rendered page needs besides its own content: the logged-in
/// user for the navigation bar and any pending flash messages.
///
/// Extracting a `Page` consumes the pending flashes, so only extract it in
/// handlers that render HTML.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub user: Option<CurrentUser>,
    pub flashes: Vec<FlashMessage>,
}

impl<S> FromRequestParts<S> for Page
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(match parts.extensions.get::<Session>() {
            Some(session) => Self::for_session(session).await,
            None => Self::default(),
        })
    }
}

impl Page {
    /// Build the page context from a session, consuming pending flashes.
    ///
    /// Handlers that may still redirect call this once they know they will
    /// render, so flashes are not lost on the redirect.
    pub async fn for_session(session: &Session) -> Self {
        let user = session
            .get::<CurrentUser>(session_keys::CURRENT_USER)
            .await
            .ok()
            .flatten();
        let flashes = take_flashes(session).await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to read flash messages");
            Vec::new()
        });

        Self { user, flashes }
    }
}
