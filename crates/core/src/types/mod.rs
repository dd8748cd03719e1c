//! Core types for Storefinder.

pub mod email;
pub mod id;
pub mod slug;
pub mod tags;

pub use email::{Email, EmailError};
pub use id::*;
pub use slug::{Slug, SlugPattern};
pub use tags::{STORE_TAG_CHOICES, normalize_tags};
