//! Password hashing with Argon2id.
//!
//! Argon2 is CPU-bound, so both operations run on the blocking
//! thread pool instead of an async worker.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

/// Well-formed Argon2id hash with default cost parameters that matches no
/// password. Login verifies against it when the email is unknown, so both
/// outcomes cost one full hash.
pub const DUMMY_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHRzb21lc2FsdA$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

/// Errors that can occur while hashing a password.
#[derive(Debug, Error)]
pub enum PasswordError {
    /// Argon2 rejected the input or parameters.
    #[error("password hashing failed")]
    Hash,

    /// The blocking task panicked or was cancelled.
    #[error("password hashing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Hash a password into a PHC string with a fresh random salt.
///
/// # Errors
///
/// Returns `PasswordError` if hashing fails.
pub async fn hash_password(password: SecretString) -> Result<String, PasswordError> {
    tokio::task::spawn_blocking(move || hash_password_blocking(&password)).await?
}

/// Check a password against a stored PHC string.
///
/// An unparsable hash never matches.
///
/// # Errors
///
/// Returns `PasswordError::Task` if the blocking task fails.
pub async fn verify_password(password: SecretString, hash: String) -> Result<bool, PasswordError> {
    Ok(tokio::task::spawn_blocking(move || verify_password_blocking(&password, &hash)).await?)
}

fn hash_password_blocking(password: &SecretString) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.expose_secret().as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| PasswordError::Hash)
}

fn verify_password_blocking(password: &SecretString, hash: &str) -> bool {
    let Ok(parsed_hash) = PasswordHash::new(hash) else {
        return false;
    };

    Argon2::default()
        .verify_password(password.expose_secret().as_bytes(), &parsed_hash)
        .is_ok()
}
