//! Domain models for the store directory.
//!
//! These are validated domain objects, separate from the database row types
//! in [`crate::db`].

pub mod session;
pub mod store;
pub mod user;

pub use session::{CurrentUser, keys as session_keys};
pub use store::{Location, Store, StoreDetail, StoreInput, StoreSubmission, TagCount, ValidationError};
pub use user::{PasswordReset, ResetToken, User};
