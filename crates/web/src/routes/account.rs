//! Account route handlers.
//!
//! These routes require authentication.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;

use crate::error::{Result, recover, set_sentry_user};
use crate::filters;
use crate::middleware::{FlashKind, Page, RequireAuth, push_flash, set_current_user};
use crate::models::CurrentUser;
use crate::state::AppState;

/// Account form data.
#[derive(Debug, Deserialize)]
pub struct AccountForm {
    pub name: String,
    pub email: String,
}

/// Account page template.
#[derive(Template, WebTemplate)]
#[template(path = "account.html")]
pub struct AccountTemplate {
    pub title: String,
    pub page: Page,
    pub name: String,
    pub email: String,
}

/// Display the account form.
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(current_user): RequireAuth,
) -> Result<Response> {
    let user = state.auth_service().get_user(current_user.id).await?;

    Ok(AccountTemplate {
        title: "Edit Your Account".to_string(),
        page: Page::for_session(&session).await,
        name: user.name,
        email: user.email.to_string(),
    }
    .into_response())
}

/// Save the account form and refresh the session copy of the user.
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(current_user): RequireAuth,
    Form(form): Form<AccountForm>,
) -> Result<Response> {
    let user = match state
        .auth_service()
        .update_account(current_user.id, &form.name, &form.email)
        .await
    {
        Ok(user) => user,
        Err(e) => return recover(&session, e, "/account").await,
    };

    set_current_user(&session, &CurrentUser::from(&user)).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    push_flash(&session, FlashKind::Success, "Updated the profile!").await?;
    Ok(Redirect::to("/account").into_response())
}
