//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::WebConfig;
use crate::db::{PgStoreRepository, PgUserRepository};
use crate::services::auth::AuthService;
use crate::services::email::EmailService;
use crate::services::images::ImageIntake;
use crate::services::stores::StoreService;
use crate::services::tags::TagService;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. Repositories are built once here and lent
/// to services per request.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: WebConfig,
    pool: PgPool,
    stores: PgStoreRepository,
    users: PgUserRepository,
    email: EmailService,
    images: ImageIntake,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the SMTP relay in `config` cannot be set up.
    pub fn new(
        config: WebConfig,
        pool: PgPool,
    ) -> Result<Self, lettre::transport::smtp::Error> {
        let email = EmailService::new(config.email.as_ref())?;
        Ok(Self::with_email(config, pool, email))
    }

    /// Create a new application state with an explicit email service.
    #[must_use]
    pub fn with_email(config: WebConfig, pool: PgPool, email: EmailService) -> Self {
        let images = ImageIntake::new(config.upload_dir.clone(), config.image_width);

        Self {
            inner: Arc::new(AppStateInner {
                stores: PgStoreRepository::new(pool.clone()),
                users: PgUserRepository::new(pool.clone()),
                config,
                pool,
                email,
                images,
            }),
        }
    }

    /// Get a reference to the configuration.
    #[must_use]
    pub fn config(&self) -> &WebConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the email service.
    #[must_use]
    pub fn email(&self) -> &EmailService {
        &self.inner.email
    }

    /// Get a reference to the photo intake.
    #[must_use]
    pub fn images(&self) -> &ImageIntake {
        &self.inner.images
    }

    /// Store service over the shared store repository.
    #[must_use]
    pub fn store_service(&self) -> StoreService<'_, PgStoreRepository> {
        StoreService::new(&self.inner.stores)
    }

    /// Tag service over the shared store repository.
    #[must_use]
    pub fn tag_service(&self) -> TagService<'_, PgStoreRepository> {
        TagService::new(&self.inner.stores)
    }

    /// Authentication service over the shared user repository.
    #[must_use]
    pub fn auth_service(&self) -> AuthService<'_, PgUserRepository> {
        AuthService::new(&self.inner.users, self.inner.config.reset_token_ttl)
    }
}
