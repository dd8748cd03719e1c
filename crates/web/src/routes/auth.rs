//! Authentication route handlers.
//!
//! Login, registration, logout, and the password reset flow.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use serde::Deserialize;
use tower_sessions::Session;

use crate::error::{Result, clear_sentry_user, recover, set_sentry_user};
use crate::filters;
use crate::middleware::{
    FlashKind, OptionalAuth, Page, clear_current_user, push_flash, set_current_user,
};
use crate::models::{CurrentUser, ResetToken, User};
use crate::services::auth::{AuthError, Registration};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(rename = "password-confirm")]
    pub password_confirm: String,
}

/// Forgot password form data.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordForm {
    pub email: String,
}

/// Reset password form data.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordForm {
    pub password: String,
    #[serde(rename = "password-confirm")]
    pub password_confirm: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template (also hosts the forgot-password form).
#[derive(Template, WebTemplate)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub title: String,
    pub page: Page,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "register.html")]
pub struct RegisterTemplate {
    pub title: String,
    pub page: Page,
}

/// Reset password page template.
#[derive(Template, WebTemplate)]
#[template(path = "reset.html")]
pub struct ResetTemplate {
    pub title: String,
    pub page: Page,
    pub action: String,
}

// =============================================================================
// Login / Logout
// =============================================================================

/// Display the login page.
pub async fn login_page(page: Page) -> impl IntoResponse {
    LoginTemplate {
        title: "Login".to_string(),
        page,
    }
}

/// Handle login form submission.
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    match state
        .auth_service()
        .login(&form.email, &form.password)
        .await
    {
        Ok(user) => {
            log_in(&session, &user).await?;
            push_flash(&session, FlashKind::Success, "Success!").await?;
            Ok(Redirect::to("/").into_response())
        }
        Err(e) => {
            tracing::debug!(error = %e, "Login failed");
            recover(&session, e, "/login").await
        }
    }
}

/// Handle logout.
pub async fn logout(session: Session, OptionalAuth(user): OptionalAuth) -> Result<Response> {
    if let Some(user) = user {
        tracing::info!(user_id = %user.id, "User logged out");
    }
    clear_current_user(&session).await?;
    clear_sentry_user();
    push_flash(&session, FlashKind::Success, "You successfully logged out!").await?;
    Ok(Redirect::to("/").into_response())
}

// =============================================================================
// Registration
// =============================================================================

/// Display the registration page.
pub async fn register_page(page: Page) -> impl IntoResponse {
    RegisterTemplate {
        title: "Register".to_string(),
        page,
    }
}

/// Handle registration form submission, then log the new user in.
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Result<Response> {
    let registration = Registration {
        name: &form.name,
        email: &form.email,
        password: &form.password,
        password_confirm: &form.password_confirm,
    };

    match state.auth_service().register(registration).await {
        Ok(user) => {
            log_in(&session, &user).await?;
            push_flash(&session, FlashKind::Success, "Success!").await?;
            Ok(Redirect::to("/").into_response())
        }
        Err(e) => recover(&session, e, "/register").await,
    }
}

// =============================================================================
// Password Reset
// =============================================================================

/// Issue a reset token and mail the link.
///
/// An unknown email gets a different message than a known one; see DESIGN.md.
pub async fn forgot(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<ForgotPasswordForm>,
) -> Result<Response> {
    let (user, reset) = match state
        .auth_service()
        .request_password_reset(&form.email, Utc::now())
        .await
    {
        Ok(issued) => issued,
        Err(e) => return recover(&session, e, "/login").await,
    };

    let reset_url = state.config().reset_url(reset.token.as_str());
    if let Err(e) = state
        .email()
        .send_password_reset(user.email.as_str(), &user.name, &reset_url)
        .await
    {
        let event_id = sentry::capture_error(&e);
        tracing::error!(error = %e, sentry_event_id = %event_id, "Failed to send reset email");
        push_flash(
            &session,
            FlashKind::Error,
            "We couldn't send the reset email. Please try again later.",
        )
        .await?;
        return Ok(Redirect::to("/login").into_response());
    }

    push_flash(
        &session,
        FlashKind::Success,
        "You have been emailed a password reset link.",
    )
    .await?;
    Ok(Redirect::to("/login").into_response())
}

/// Display the reset form if the token is still valid.
pub async fn reset_page(
    State(state): State<AppState>,
    session: Session,
    Path(token): Path<String>,
) -> Result<Response> {
    let token = ResetToken::from_presented(token);
    if !token.is_well_formed() {
        return recover(&session, AuthError::InvalidResetToken, "/login").await;
    }
    if let Err(e) = state
        .auth_service()
        .user_for_reset_token(&token, Utc::now())
        .await
    {
        return recover(&session, e, "/login").await;
    }

    Ok(ResetTemplate {
        title: "Reset Your Password".to_string(),
        page: Page::for_session(&session).await,
        action: format!("/account/reset/{}", token.as_str()),
    }
    .into_response())
}

/// Set the new password, then log the user in.
pub async fn reset(
    State(state): State<AppState>,
    session: Session,
    Path(token): Path<String>,
    Form(form): Form<ResetPasswordForm>,
) -> Result<Response> {
    let token = ResetToken::from_presented(token);
    // Only issued-shape tokens are echoed into the Location header.
    if !token.is_well_formed() {
        return recover(&session, AuthError::InvalidResetToken, "/login").await;
    }
    let back = format!("/account/reset/{}", token.as_str());

    let result = state
        .auth_service()
        .reset_password(&token, &form.password, &form.password_confirm, Utc::now())
        .await;

    match result {
        Ok(user) => {
            log_in(&session, &user).await?;
            push_flash(&session, FlashKind::Success, "Your password has been reset!").await?;
            Ok(Redirect::to("/").into_response())
        }
        // Unknown or expired tokens go back to the login page.
        Err(e @ AuthError::InvalidResetToken) => recover(&session, e, "/login").await,
        Err(e) => recover(&session, e, &back).await,
    }
}

async fn log_in(session: &Session, user: &User) -> Result<()> {
    set_current_user(session, &CurrentUser::from(user)).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(())
}
