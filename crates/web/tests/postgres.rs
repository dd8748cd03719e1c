//! Repository tests against a real `PostgreSQL` database.
//!
//! These exercise the SQL that the in-memory repository stands in for:
//! slug collision counting and the reset-token expiry and consume queries.
//!
//! Run with:
//!
//! ```text
//! STOREFINDER_TEST_DATABASE_URL=postgres://localhost/storefinder_test \
//!     cargo test -p storefinder-web --test postgres -- --ignored
//! ```

#![allow(clippy::unwrap_used)]

use chrono::{SubsecRound, TimeDelta, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use storefinder_core::Email;
use storefinder_web::db::{PgStoreRepository, PgUserRepository, UserRepository};
use storefinder_web::models::{PasswordReset, ResetToken, StoreSubmission, User};
use storefinder_web::services::stores::StoreService;

const DATABASE_URL_VAR: &str = "STOREFINDER_TEST_DATABASE_URL";

async fn pool() -> PgPool {
    let url = std::env::var(DATABASE_URL_VAR)
        .unwrap_or_else(|_| panic!("{DATABASE_URL_VAR} must be set for --ignored tests"));
    let pool = PgPool::connect(&url).await.unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    pool
}

/// A fresh user with an email no earlier run has taken.
async fn user(users: &PgUserRepository) -> User {
    let email = Email::parse(&format!("{}@example.com", Uuid::new_v4().simple())).unwrap();
    users.create(&email, "Owner", "not-a-real-hash").await.unwrap()
}

fn submission(name: &str) -> StoreSubmission {
    StoreSubmission {
        name: name.to_owned(),
        description: "Coffee".to_owned(),
        tags: vec!["Wifi".to_owned()],
        address: "1 Main St".to_owned(),
        longitude: "-79.38".to_owned(),
        latitude: "43.65".to_owned(),
        photo: None,
    }
}

// =============================================================================
// Slugs
// =============================================================================

#[tokio::test]
#[ignore = "requires PostgreSQL (STOREFINDER_TEST_DATABASE_URL)"]
async fn test_same_name_gets_numbered_slugs() {
    let pool = pool().await;
    let users = PgUserRepository::new(pool.clone());
    let stores = PgStoreRepository::new(pool);
    let service = StoreService::new(&stores);
    let owner = user(&users).await;

    // Unique per run so earlier rows never collide.
    let name = format!("Cafe One {}", Uuid::new_v4().simple());
    let base = name.to_lowercase().replace(' ', "-");

    let first = service.create(owner.id, submission(&name)).await.unwrap();
    let second = service.create(owner.id, submission(&name)).await.unwrap();
    let third = service
        .create(owner.id, submission(&name.to_uppercase()))
        .await
        .unwrap();

    assert_eq!(first.slug.as_str(), base);
    assert_eq!(second.slug.as_str(), format!("{base}-2"));
    assert_eq!(third.slug.as_str(), format!("{base}-3"));
}

#[tokio::test]
#[ignore = "requires PostgreSQL (STOREFINDER_TEST_DATABASE_URL)"]
async fn test_prefix_names_do_not_collide() {
    let pool = pool().await;
    let users = PgUserRepository::new(pool.clone());
    let stores = PgStoreRepository::new(pool);
    let service = StoreService::new(&stores);
    let owner = user(&users).await;

    let name = format!("Cafe {}", Uuid::new_v4().simple());
    let longer = service
        .create(owner.id, submission(&format!("{name} Annex")))
        .await
        .unwrap();
    let shorter = service.create(owner.id, submission(&name)).await.unwrap();

    assert_eq!(
        longer.slug.as_str(),
        format!("{}-annex", shorter.slug.as_str())
    );
    assert!(!shorter.slug.as_str().ends_with("-2"));
}

// =============================================================================
// Password Reset
// =============================================================================

#[tokio::test]
#[ignore = "requires PostgreSQL (STOREFINDER_TEST_DATABASE_URL)"]
async fn test_reset_token_rejected_at_expiry() {
    let users = PgUserRepository::new(pool().await);
    let owner = user(&users).await;

    // TIMESTAMPTZ keeps microseconds.
    let expires_at = Utc::now().trunc_subsecs(6) + TimeDelta::minutes(5);
    let reset = PasswordReset {
        token: ResetToken::generate(),
        expires_at,
    };
    users.set_password_reset(owner.id, &reset).await.unwrap();

    let found = users
        .find_by_reset_token(&reset.token, expires_at - TimeDelta::milliseconds(1))
        .await
        .unwrap();
    assert_eq!(found.map(|u| u.id), Some(owner.id));

    assert!(
        users
            .find_by_reset_token(&reset.token, expires_at)
            .await
            .unwrap()
            .is_none()
    );
    assert!(
        users
            .complete_password_reset(&reset.token, expires_at, "new-hash")
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
#[ignore = "requires PostgreSQL (STOREFINDER_TEST_DATABASE_URL)"]
async fn test_reset_token_is_consumed_once() {
    let pool = pool().await;
    let users = PgUserRepository::new(pool.clone());
    let owner = user(&users).await;

    let now = Utc::now();
    let reset = PasswordReset::issue(now, TimeDelta::minutes(6));
    users.set_password_reset(owner.id, &reset).await.unwrap();

    let updated = users
        .complete_password_reset(&reset.token, now, "first-hash")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.id, owner.id);
    assert!(updated.password_reset.is_none());

    assert!(
        users
            .complete_password_reset(&reset.token, now, "second-hash")
            .await
            .unwrap()
            .is_none()
    );

    let (token_cleared, expiry_cleared, hash): (bool, bool, String) = sqlx::query_as(
        r"
        SELECT reset_password_token IS NULL, reset_password_expires IS NULL, password_hash
        FROM users
        WHERE id = $1
        ",
    )
    .bind(owner.id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert!(token_cleared);
    assert!(expiry_cleared);
    assert_eq!(hash, "first-hash");

    let reloaded = users.get_by_id(owner.id).await.unwrap().unwrap();
    assert!(reloaded.password_reset.is_none());
}
