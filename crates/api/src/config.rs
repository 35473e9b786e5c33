//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `MERCADO_TOKEN_SECRET` - Bearer token signing secret (min 32 chars, high
//!   entropy). Falls back to `ACCESS_TOKEN`.
//!
//! ## Optional
//! - `MERCADO_DATABASE_URL` - `SQLite` connection string (default:
//!   `sqlite://mercado.db`). Falls back to `DATABASE_URL`.
//! - `MERCADO_HOST` - Bind address (default: 127.0.0.1)
//! - `MERCADO_PORT` - Listen port (default: 8080)
//! - `MERCADO_PUBLIC_BASE_URL` - Base URL used to build image URLs
//!   (default: `http://{host}:{port}`)
//! - `MERCADO_UPLOAD_DIR` - Directory for uploaded images (default: uploads)
//! - `MERCADO_MAX_UPLOAD_BYTES` - Request body limit for uploads (default: 5 MiB)
//! - `MERCADO_STATEMENT_TIMEOUT_SECS` - Per-statement timeout (default: 5)
//! - `MERCADO_LOG_FORMAT` - `json` for structured log lines (default: text)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const MIN_TOKEN_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

const DEFAULT_DATABASE_URL: &str = "sqlite://mercado.db";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
const DEFAULT_STATEMENT_TIMEOUT_SECS: u64 = 5;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// API application configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// `SQLite` database connection URL
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL, prefix of every image URL handed to clients
    pub public_base_url: Url,
    /// Bearer token signing secret
    pub token_secret: SecretString,
    /// Directory uploaded images are written to and served from
    pub upload_dir: PathBuf,
    /// Maximum accepted request body size for uploads
    pub max_upload_bytes: usize,
    /// Upper bound for a single store call
    pub statement_timeout: Duration,
    /// Emit JSON log lines instead of human-readable text
    pub log_json: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the token secret is missing or weak, or if an
    /// optional variable is present but unparsable.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("MERCADO_DATABASE_URL");
        let host = get_env_or_default("MERCADO_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("MERCADO_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("MERCADO_PORT", "8080")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("MERCADO_PORT".to_string(), e.to_string()))?;

        let public_base_url = get_optional_env("MERCADO_PUBLIC_BASE_URL")
            .unwrap_or_else(|| format!("http://{}", SocketAddr::new(host, port)));
        let public_base_url = parse_base_url(&public_base_url, "MERCADO_PUBLIC_BASE_URL")?;

        let token_secret = get_token_secret("MERCADO_TOKEN_SECRET")?;

        let upload_dir = PathBuf::from(get_env_or_default("MERCADO_UPLOAD_DIR", "uploads"));
        let max_upload_bytes = get_optional_env("MERCADO_MAX_UPLOAD_BYTES")
            .map(|v| {
                v.parse::<usize>().map_err(|e| {
                    ConfigError::InvalidEnvVar("MERCADO_MAX_UPLOAD_BYTES".to_string(), e.to_string())
                })
            })
            .transpose()?
            .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);
        let statement_timeout = get_optional_env("MERCADO_STATEMENT_TIMEOUT_SECS")
            .map(|v| {
                v.parse::<u64>().map_err(|e| {
                    ConfigError::InvalidEnvVar(
                        "MERCADO_STATEMENT_TIMEOUT_SECS".to_string(),
                        e.to_string(),
                    )
                })
            })
            .transpose()?
            .map_or(
                Duration::from_secs(DEFAULT_STATEMENT_TIMEOUT_SECS),
                Duration::from_secs,
            );

        Ok(Self {
            database_url,
            host,
            port,
            public_base_url,
            token_secret,
            upload_dir,
            max_upload_bytes,
            statement_timeout,
            log_json: get_optional_env("MERCADO_LOG_FORMAT")
                .is_some_and(|v| v.eq_ignore_ascii_case("json")),
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`, then the local file default.
fn get_database_url(primary_key: &str) -> SecretString {
    std::env::var(primary_key)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map_or_else(
            |_| SecretString::from(DEFAULT_DATABASE_URL),
            SecretString::from,
        )
}

/// Get the token secret with fallback to the legacy `ACCESS_TOKEN` name.
fn get_token_secret(primary_key: &str) -> Result<SecretString, ConfigError> {
    let key = if std::env::var(primary_key).is_err() && std::env::var("ACCESS_TOKEN").is_ok() {
        "ACCESS_TOKEN"
    } else {
        primary_key
    };
    let secret = get_validated_secret(key)?;
    validate_token_secret(&secret, key)?;
    Ok(secret)
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse the public base URL, ensuring a trailing slash so relative joins
/// append to its path instead of replacing the last segment.
fn parse_base_url(value: &str, var_name: &str) -> Result<Url, ConfigError> {
    let value = if value.ends_with('/') {
        value.to_string()
    } else {
        format!("{value}/")
    };
    let url = Url::parse(&value)
        .map_err(|e| ConfigError::InvalidEnvVar(var_name.to_string(), e.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            "must be an absolute http(s) URL".to_string(),
        ));
    }
    Ok(url)
}

/// Validate that a token secret meets minimum length requirements.
fn validate_token_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_TOKEN_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_TOKEN_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    // Check blocklist
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
