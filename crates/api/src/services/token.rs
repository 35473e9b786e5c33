//! Signed bearer tokens (HS256 JWT).
//!
//! A token carries the user ID in `sub` and expires one hour after issue.
//! Verification has no leeway, and every failure (bad signature, malformed
//! token, expiry, wrong algorithm) is reported as the same
//! [`TokenError::Invalid`].

use std::fmt;

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use mercado_core::UserId;

/// Token lifetime in seconds.
pub const TOKEN_TTL_SECS: i64 = 3600;

/// Errors that can occur when issuing or verifying tokens.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The token cannot be trusted.
    #[error("invalid token")]
    Invalid,

    /// Encoding the token failed.
    #[error("token signing failed: {0}")]
    Signing(jsonwebtoken::errors::Error),
}

/// Claims embedded in every token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User ID, as a decimal string.
    pub sub: String,
    /// Issued-at, seconds since the Unix epoch.
    pub iat: i64,
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
}

impl Claims {
    /// The user the token was issued to.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Invalid` if `sub` is not a user ID.
    pub fn user_id(&self) -> Result<UserId, TokenError> {
        self.sub
            .parse::<i64>()
            .map(UserId::new)
            .map_err(|_| TokenError::Invalid)
    }
}

/// Issues and verifies tokens with a process-wide secret.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService").finish_non_exhaustive()
    }
}

impl TokenService {
    /// Create a token service from the signing secret.
    #[must_use]
    pub fn new(secret: &SecretString) -> Self {
        let key = secret.expose_secret().as_bytes();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(key),
            decoding: DecodingKey::from_secret(key),
            validation,
        }
    }

    /// Issue a token for `user_id`, valid for one hour from now.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Signing` if encoding fails.
    pub fn issue(&self, user_id: UserId) -> Result<String, TokenError> {
        self.issue_at(user_id, Utc::now().timestamp())
    }

    /// Issue a token as if it were issued at `issued_at` (Unix seconds).
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Signing` if encoding fails.
    pub fn issue_at(&self, user_id: UserId, issued_at: i64) -> Result<String, TokenError> {
        let claims = Claims {
            sub: user_id.to_string(),
            iat: issued_at,
            exp: issued_at + TOKEN_TTL_SECS,
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(TokenError::Signing)
    }

    /// Verify a token and return its claims.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Invalid` for any token that cannot be trusted.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|e| {
                tracing::debug!(error = %e, "Token rejected");
                TokenError::Invalid
            })?;

        // A token whose subject is not a user ID is as useless as a forged one.
        data.claims.user_id()?;
        Ok(data.claims)
    }
}
