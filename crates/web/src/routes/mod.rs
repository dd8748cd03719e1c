//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                  - Liveness check
//! GET  /health/ready            - Readiness check (database)
//!
//! # Stores
//! GET  /                        - Store listing
//! GET  /stores                  - Store listing
//! GET  /store/{slug}            - Store detail
//! GET  /add                     - New store form (requires auth)
//! POST /add                     - Create store (requires auth, multipart)
//! POST /add/{id}                - Update store (owner only, multipart)
//! GET  /stores/{id}/edit        - Edit store form (owner only)
//!
//! # Tags
//! GET  /tags                    - All tags, all stores
//! GET  /tags/{tag}              - All tags, stores with the tag
//!
//! # Auth
//! GET  /login                   - Login page
//! POST /login                   - Login action
//! GET  /register                - Register page
//! POST /register                - Register action
//! GET  /logout                  - Logout action
//!
//! # Account
//! GET  /account                 - Account form (requires auth)
//! POST /account                 - Save account (requires auth)
//! POST /account/forgot          - Mail a password reset link
//! GET  /account/reset/{token}   - Reset form
//! POST /account/reset/{token}   - Set the new password
//!
//! GET  /uploads/*               - Resized store photos
//! ```

pub mod account;
pub mod auth;
pub mod stores;
pub mod tags;

use axum::{
    Router,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    middleware::from_fn,
    response::IntoResponse,
    routing::{get, post},
};
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tower_sessions::{SessionManagerLayer, SessionStore};
use tracing::Span;

use crate::error::NotFoundTemplate;
use crate::middleware::{Page, request_id_middleware};
use crate::state::AppState;

/// Create the store routes router.
///
/// The add/edit form posts may carry a full-size photo, so they accept
/// bodies up to `upload_limit` bytes instead of axum's 2 MB default.
pub fn store_routes(upload_limit: usize) -> Router<AppState> {
    Router::new()
        .route("/", get(stores::list))
        .route("/stores", get(stores::list))
        .route("/store/{slug}", get(stores::show))
        .route(
            "/add",
            get(stores::add_form)
                .post(stores::create)
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/add/{id}",
            post(stores::update).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/stores/{id}/edit", get(stores::edit_form))
}

/// Create the tag routes router.
pub fn tag_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(tags::all))
        .route("/{tag}", get(tags::by_tag))
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", get(auth::logout))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(account::index).post(account::update))
        .route("/forgot", post(auth::forgot))
        .route("/reset/{token}", get(auth::reset_page).post(auth::reset))
}

/// Create all page routes.
pub fn routes(upload_limit: usize) -> Router<AppState> {
    Router::new()
        .merge(store_routes(upload_limit))
        .merge(auth_routes())
        .nest("/tags", tag_routes())
        .nest("/account", account_routes())
}

/// Build the full application: pages, health checks, uploads, and layers.
///
/// The session store is a parameter so tests can run on an in-memory store.
pub fn app<S>(state: AppState, session_layer: SessionManagerLayer<S>) -> Router
where
    S: SessionStore + Clone,
{
    let uploads = ServeDir::new(state.images().upload_dir());
    let upload_limit = state.config().max_upload_bytes;

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes(upload_limit))
        .nest_service("/uploads", uploads)
        .fallback(not_found)
        .layer(session_layer)
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

async fn not_found(page: Page) -> impl IntoResponse {
    (StatusCode::NOT_FOUND, NotFoundTemplate::new(page))
}
