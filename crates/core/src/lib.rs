//! Hearthglow Core - Shared types library.
//!
//! This crate provides common types used across all Hearthglow components:
//! - `api` - REST backend for the storefront and admin panel
//! - `cli` - Command-line tools for migrations and management
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no database
//! access, no HTTP clients. This keeps it lightweight and allows it to be
//! used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, slugs, roles/permissions, statuses,
//!   money helpers, and tag-set operations

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
