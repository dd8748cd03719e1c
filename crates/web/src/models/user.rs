//! User domain types.

use core::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use rand::RngCore;

use storefinder_core::{Email, UserId};

/// Number of random bytes in a reset token (hex-encoded to twice as many chars).
pub const RESET_TOKEN_BYTES: usize = 20;

/// A registered user (domain type).
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// User's email address (normalized).
    pub email: Email,
    /// Display name.
    pub name: String,
    /// Pending password reset, if one was requested.
    ///
    /// Token and expiry travel together, so a user can never hold one
    /// without the other.
    pub password_reset: Option<PasswordReset>,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

/// A pending password reset: the token mailed to the user and its expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordReset {
    /// Random token embedded in the reset link.
    pub token: ResetToken,
    /// Absolute expiry; the token is valid strictly before this instant.
    pub expires_at: DateTime<Utc>,
}

impl PasswordReset {
    /// Issue a fresh token that expires `ttl` after `now`.
    #[must_use]
    pub fn issue(now: DateTime<Utc>, ttl: TimeDelta) -> Self {
        Self {
            token: ResetToken::generate(),
            expires_at: now + ttl,
        }
    }

    /// Whether the token is still usable at `now`.
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// An opaque password reset token.
///
/// `Debug` is redacted so tokens never end up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct ResetToken(String);

impl ResetToken {
    /// Generate a token from the thread-local CSPRNG, which is seeded and
    /// periodically reseeded from the operating system.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; RESET_TOKEN_BYTES];
        rand::rng().fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// Wrap a token presented in a URL or read back from storage.
    #[must_use]
    pub fn from_presented(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Whether the token has the shape of one this crate issues: lowercase
    /// or uppercase hex, two digits per random byte.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.0.len() == RESET_TOKEN_BYTES * 2 && self.0.bytes().all(|b| b.is_ascii_hexdigit())
    }

    /// Returns the token as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ResetToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ResetToken([REDACTED])")
    }
}
