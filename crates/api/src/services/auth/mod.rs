//! Authentication service.
//!
//! Signup stores an Argon2id hash; login checks it and issues a bearer token.

mod error;

pub use error::AuthError;

use secrecy::SecretString;

use mercado_core::{Email, UserId};

use crate::db::{Database, RepositoryError, UserRepository};
use crate::models::user::User;
use crate::services::password::{DUMMY_HASH, hash_password, verify_password};
use crate::services::token::TokenService;

/// Authentication service.
///
/// Handles user registration and password login.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    tokens: &'a TokenService,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(db: &'a Database, tokens: &'a TokenService) -> Self {
        Self {
            users: UserRepository::new(db),
            tokens,
        }
    }

    /// Register a new user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered,
    /// including when a concurrent signup wins the race to insert it.
    pub async fn signup(
        &self,
        name: &str,
        email: &str,
        password: SecretString,
    ) -> Result<UserId, AuthError> {
        let email = Email::parse(email)?;

        if self.users.email_exists(&email).await? {
            return Err(AuthError::UserAlreadyExists);
        }

        let password_hash = hash_password(password).await?;

        let id = self
            .users
            .create_with_password(name.trim(), &email, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %id, "User signed up");
        Ok(id)
    }

    /// Login with email and password, returning the user and a fresh token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email is unknown,
    /// malformed, or the password is wrong.
    pub async fn login(
        &self,
        email: &str,
        password: SecretString,
    ) -> Result<(User, String), AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let Some((user, password_hash)) = self.users.get_password_hash(&email).await? else {
            // Spend the same hashing work as a real check before refusing.
            verify_password(password, DUMMY_HASH.to_string()).await?;
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password(password, password_hash).await? {
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.tokens.issue(user.id)?;
        tracing::info!(user_id = %user.id, "User logged in");
        Ok((user, token))
    }
}
