//! Business logic services.

pub mod auth;
pub mod password;
pub mod token;
pub mod uploads;
