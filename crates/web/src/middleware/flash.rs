//! One-shot flash messages stored in the session.
//!
//! A handler pushes a message before redirecting; the next rendered page
//! takes every pending message out of the session and shows it once.

use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::models::session_keys;

/// Severity of a flash message, used as its CSS class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Success,
    Error,
}

impl std::fmt::Display for FlashKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Success => "success",
            Self::Error => "error",
        })
    }
}

/// A pending notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub kind: FlashKind,
    pub message: String,
    /// Optional follow-up link shown after the message.
    #[serde(default)]
    pub link: Option<FlashLink>,
}

/// A link attached to a flash message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashLink {
    pub href: String,
    pub label: String,
}

/// Queue a flash message for the next rendered page.
///
/// # Errors
///
/// Returns an error if the session cannot be read or modified.
pub async fn push_flash(
    session: &Session,
    kind: FlashKind,
    message: impl Into<String>,
) -> Result<(), tower_sessions::session::Error> {
    push(
        session,
        FlashMessage {
            kind,
            message: message.into(),
            link: None,
        },
    )
    .await
}

/// Queue a flash message followed by a link.
///
/// # Errors
///
/// Returns an error if the session cannot be read or modified.
pub async fn push_flash_with_link(
    session: &Session,
    kind: FlashKind,
    message: impl Into<String>,
    link: FlashLink,
) -> Result<(), tower_sessions::session::Error> {
    push(
        session,
        FlashMessage {
            kind,
            message: message.into(),
            link: Some(link),
        },
    )
    .await
}

async fn push(
    session: &Session,
    flash: FlashMessage,
) -> Result<(), tower_sessions::session::Error> {
    let mut pending: Vec<FlashMessage> = session
        .get(session_keys::FLASH)
        .await?
        .unwrap_or_default();
    pending.push(flash);
    session.insert(session_keys::FLASH, pending).await
}

/// Queue several messages of the same kind.
///
/// # Errors
///
/// Returns an error if the session cannot be read or modified.
pub async fn push_flashes(
    session: &Session,
    kind: FlashKind,
    messages: impl IntoIterator<Item = String>,
) -> Result<(), tower_sessions::session::Error> {
    for message in messages {
        push_flash(session, kind, message).await?;
    }
    Ok(())
}

/// Remove and return every pending message.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn take_flashes(
    session: &Session,
) -> Result<Vec<FlashMessage>, tower_sessions::session::Error> {
    Ok(session
        .remove::<Vec<FlashMessage>>(session_keys::FLASH)
        .await?
        .unwrap_or_default())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;

    #[tokio::test]
    async fn test_flashes_are_consumed_once() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);

        push_flash(&session, FlashKind::Success, "Success!").await.unwrap();
        push_flashes(
            &session,
            FlashKind::Error,
            ["one".to_string(), "two".to_string()],
        )
        .await
        .unwrap();

        let taken = take_flashes(&session).await.unwrap();
        let kinds: Vec<_> = taken.iter().map(|f| f.kind.to_string()).collect();
        assert_eq!(kinds, ["success", "error", "error"]);
        assert_eq!(taken[0].message, "Success!");

        assert!(take_flashes(&session).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_flash_link_survives_the_session() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        let link = FlashLink {
            href: "/store/cafe-one".to_string(),
            label: "View Store →".to_string(),
        };

        push_flash_with_link(
            &session,
            FlashKind::Success,
            "Successfully updated Cafe One.",
            link.clone(),
        )
        .await
        .unwrap();

        let taken = take_flashes(&session).await.unwrap();
        assert_eq!(taken.len(), 1);
        assert_eq!(taken[0].link.as_ref(), Some(&link));
    }
}
