//! Mercado Core - Shared domain types.
//!
//! This crate provides the types shared by the Mercado components:
//! - `api` - The REST backend (users, catalog, checkout)
//! - `integration-tests` - Black-box HTTP tests against the API router
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no database
//! access, no HTTP. Database encoding is available behind the `sqlite`
//! feature so the API crate can bind these types directly.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, emails, prices, and quantities

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
