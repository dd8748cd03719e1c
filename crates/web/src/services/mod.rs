//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Registration, login, profile updates, password reset
//! - `stores` - Store records, slugs, ownership checks
//! - `tags` - Tag counts and tag filtering
//! - `images` - Photo upload validation and resizing
//! - `email` - Password reset mail delivery
//!
//! Services borrow repositories from [`AppState`](crate::state::AppState)
//! for the length of a request.

pub mod auth;
pub mod email;
pub mod images;
pub mod stores;
pub mod tags;
