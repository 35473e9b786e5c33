//! User repository for database operations.

use chrono::{DateTime, Utc};

use mercado_core::{Email, UserId};

use super::{Database, RepositoryError};
use crate::models::user::User;

/// Row shape shared by the user queries.
#[derive(sqlx::FromRow)]
struct UserRow {
    id: UserId,
    name: String,
    email: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> Result<(User, String), RepositoryError> {
        let email = Email::parse(&self.email)
            .map_err(|e| RepositoryError::DataCorruption(format!("invalid email: {e}")))?;

        let user = User {
            id: self.id,
            name: self.name,
            email,
            created_at: self.created_at,
        };
        Ok((user, self.password_hash))
    }
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    db: &'a Database,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Whether a user with this email exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn email_exists(&self, email: &Email) -> Result<bool, RepositoryError> {
        let row: Option<(i64,)> = self
            .db
            .query_one(sqlx::query_as("SELECT 1 FROM users WHERE email = ?").bind(email))
            .await?;
        Ok(row.is_some())
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the email in the database is invalid.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> = self
            .db
            .query_one(
                sqlx::query_as(
                    "SELECT id, name, email, password_hash, created_at FROM users WHERE id = ?",
                )
                .bind(id),
            )
            .await?;

        row.map(|r| r.into_user().map(|(user, _)| user)).transpose()
    }

    /// Get a user together with their password hash, by email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the email in the database is invalid.
    pub async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row: Option<UserRow> = self
            .db
            .query_one(
                sqlx::query_as(
                    "SELECT id, name, email, password_hash, created_at FROM users WHERE email = ?",
                )
                .bind(email),
            )
            .await?;

        row.map(UserRow::into_user).transpose()
    }

    /// Create a new user with a hashed password.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create_with_password(
        &self,
        name: &str,
        email: &Email,
        password_hash: &str,
    ) -> Result<UserId, RepositoryError> {
        let outcome = self
            .db
            .execute(
                sqlx::query(
                    "INSERT INTO users (name, email, password_hash, created_at) VALUES (?, ?, ?, ?)",
                )
                .bind(name)
                .bind(email)
                .bind(password_hash)
                .bind(Utc::now()),
            )
            .await?;

        Ok(UserId::new(outcome.last_insert_id))
    }
}
