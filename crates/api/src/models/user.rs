//! User domain types.

use chrono::{DateTime, Utc};

use mercado_core::{Email, UserId};

/// A registered shop user (domain type).
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Display name given at signup.
    pub name: String,
    /// User's email address, unique across users.
    pub email: Email,
    /// When the user signed up.
    pub created_at: DateTime<Utc>,
}
