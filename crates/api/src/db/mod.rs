//! Persistence gateway for the Mercado `SQLite` store.
//!
//! Every statement the API issues goes through [`Database`]. Statements use
//! positional `?` binding and each call is bounded by the configured statement
//! timeout.
//!
//! ## Tables
//!
//! - `users` - Accounts (unique email, Argon2 password hash)
//! - `products` - Catalog entries with decimal TEXT prices and optional stock
//! - `images` - One image per product, removed with the product
//! - `orders` - Append-only checkout records
//!
//! The schema in `schema.sql` is applied idempotently at startup.

pub mod orders;
pub mod products;
pub mod users;

use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use sqlx::query::{Query, QueryAs};
use sqlx::sqlite::{
    SqliteArguments, SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions,
    SqliteRow,
};
use sqlx::{FromRow, Sqlite, Transaction};
use thiserror::Error;

pub use orders::OrderRepository;
pub use products::ProductRepository;
pub use users::UserRepository;

/// Idempotent schema, applied by [`Database::init_schema`].
const SCHEMA: &str = include_str!("schema.sql");

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_CONNECTIONS: u32 = 5;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// A statement did not finish within the statement timeout.
    #[error("statement timed out after {0:?}")]
    Timeout(Duration),
}

impl RepositoryError {
    /// Classify a sqlx error, surfacing unique violations as `Conflict`.
    #[must_use]
    pub fn from_sqlx(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && db_err.is_unique_violation()
        {
            return Self::Conflict(db_err.message().to_owned());
        }
        Self::Database(err)
    }
}

/// Result of a write statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOutcome {
    /// Number of rows changed by the statement.
    pub rows_affected: u64,
    /// Rowid of the last inserted row on this connection.
    pub last_insert_id: i64,
}

/// Handle to the store, shared through `AppState`.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    statement_timeout: Duration,
}

impl Database {
    /// Open a connection pool for `database_url`, creating the file if needed.
    ///
    /// Every connection has foreign keys enabled, a WAL journal, and a 5 s
    /// busy timeout. In-memory URLs get a single long-lived connection so
    /// all callers see the same database.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the URL is invalid or the
    /// connection cannot be established.
    pub async fn connect(
        database_url: &SecretString,
        statement_timeout: Duration,
    ) -> Result<Self, RepositoryError> {
        let url = database_url.expose_secret();
        if url.contains(":memory:") {
            return Self::in_memory(statement_timeout).await;
        }

        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect_with(options)
            .await?;

        Ok(Self::from_pool(pool, statement_timeout))
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if `SQLite` cannot be opened.
    pub async fn in_memory(statement_timeout: Duration) -> Result<Self, RepositoryError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        // The database lives exactly as long as its only connection.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect_with(options)
            .await?;

        Ok(Self::from_pool(pool, statement_timeout))
    }

    /// Wrap an existing pool.
    #[must_use]
    pub const fn from_pool(pool: SqlitePool, statement_timeout: Duration) -> Self {
        Self {
            pool,
            statement_timeout,
        }
    }

    /// Get a reference to the underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create all tables and indexes that do not exist yet.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if a DDL statement fails.
    pub async fn init_schema(&self) -> Result<(), RepositoryError> {
        self.bounded(async {
            sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
            Ok(())
        })
        .await
    }

    /// Check that the store answers a trivial query.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store is unreachable.
    pub async fn ping(&self) -> Result<(), RepositoryError> {
        self.bounded(async {
            sqlx::query("SELECT 1").execute(&self.pool).await?;
            Ok(())
        })
        .await
    }

    /// Run a write statement.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` on a unique violation,
    /// `RepositoryError::Timeout` on expiry, `RepositoryError::Database`
    /// otherwise.
    pub async fn execute<'q>(
        &self,
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> Result<WriteOutcome, RepositoryError> {
        self.bounded(async {
            let result = query
                .execute(&self.pool)
                .await
                .map_err(RepositoryError::from_sqlx)?;
            Ok(WriteOutcome {
                rows_affected: result.rows_affected(),
                last_insert_id: result.last_insert_rowid(),
            })
        })
        .await
    }

    /// Fetch at most one row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Timeout` on expiry, `RepositoryError::Database`
    /// if the statement fails or a row cannot be decoded.
    pub async fn query_one<'q, O>(
        &self,
        query: QueryAs<'q, Sqlite, O, SqliteArguments<'q>>,
    ) -> Result<Option<O>, RepositoryError>
    where
        O: Send + Unpin + for<'r> FromRow<'r, SqliteRow>,
    {
        self.bounded(async { Ok(query.fetch_optional(&self.pool).await?) })
            .await
    }

    /// Fetch every matching row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Timeout` on expiry, `RepositoryError::Database`
    /// if the statement fails or a row cannot be decoded.
    pub async fn query_all<'q, O>(
        &self,
        query: QueryAs<'q, Sqlite, O, SqliteArguments<'q>>,
    ) -> Result<Vec<O>, RepositoryError>
    where
        O: Send + Unpin + for<'r> FromRow<'r, SqliteRow>,
    {
        self.bounded(async { Ok(query.fetch_all(&self.pool).await?) })
            .await
    }

    /// Begin a transaction. Dropping it without `commit` rolls back.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if no connection is available.
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>, RepositoryError> {
        Ok(self.pool.begin().await?)
    }

    /// Run a unit of work under the statement timeout.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Timeout` (converted into `E`) if `work` does
    /// not finish in time, otherwise whatever `work` returns.
    pub async fn bounded<F, T, E>(&self, work: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: From<RepositoryError>,
    {
        tokio::time::timeout(self.statement_timeout, work)
            .await
            .map_err(|_| E::from(RepositoryError::Timeout(self.statement_timeout)))?
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    pub(crate) async fn test_db() -> Database {
        let db = Database::in_memory(Duration::from_secs(5)).await.unwrap();
        db.init_schema().await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_init_schema_is_idempotent() {
        let db = test_db().await;
        db.init_schema().await.unwrap();
        db.ping().await.unwrap();
    }

    #[tokio::test]
    async fn test_execute_reports_insert_id() {
        let db = test_db().await;
        let outcome = db
            .execute(
                sqlx::query(
                    "INSERT INTO users (name, email, password_hash, created_at) VALUES (?, ?, ?, ?)",
                )
                .bind("Ana")
                .bind("ana@example.com")
                .bind("hash")
                .bind(chrono::Utc::now()),
            )
            .await
            .unwrap();
        assert_eq!(outcome.rows_affected, 1);
        assert_eq!(outcome.last_insert_id, 1);
    }

    #[tokio::test]
    async fn test_unique_violation_is_conflict() {
        let db = test_db().await;
        let insert = || {
            sqlx::query(
                "INSERT INTO users (name, email, password_hash, created_at) VALUES (?, ?, ?, ?)",
            )
            .bind("Ana")
            .bind("ana@example.com")
            .bind("hash")
            .bind(chrono::Utc::now())
        };
        db.execute(insert()).await.unwrap();
        let err = db.execute(insert()).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_query_one_none_when_absent() {
        let db = test_db().await;
        let row: Option<(i64,)> = db
            .query_one(sqlx::query_as("SELECT id FROM users WHERE id = ?").bind(99_i64))
            .await
            .unwrap();
        assert!(row.is_none());
    }

    #[tokio::test]
    async fn test_bounded_times_out() {
        let db = Database::in_memory(Duration::from_millis(10)).await.unwrap();
        let err: RepositoryError = db
            .bounded(async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok(())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Timeout(_)));
    }
}
