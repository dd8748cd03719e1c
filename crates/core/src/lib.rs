//! Storefinder Core - Shared domain types.
//!
//! This crate provides the types used across Storefinder components:
//! - `web` - The store directory web application
//! - `cli` - Command-line tools for migrations and account management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP. Slug derivation and tag normalization live here so they can
//! be tested without a running database.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, slugs, and tag helpers

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
