//! Mercado API library.
//!
//! This crate provides the REST backend as a library, allowing the router to
//! be driven in-process by tests and reused by the `mercado-api` binary.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod validation;
