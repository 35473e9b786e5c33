//! Request payload validation.
//!
//! Request bodies deserialize into structs whose client fields are all
//! `Option`s. [`Required`] then pulls out the mandatory ones, recording every
//! missing name so the client learns about all of them at once.
//!
//! A field is missing when it is absent, `null`, or a blank string. Numbers
//! are present whatever their value, so `categoryId: 0` counts.
//!
//! ```
//! use mercado_api::validation::Required;
//!
//! let mut required = Required::default();
//! let name = required.take("name", Some("Mug".to_string()));
//! let email = required.take("email", Some("  ".to_string()));
//! let count = required.take("count", Some(0_i64));
//!
//! assert!(name.is_some());
//! assert!(email.is_none());
//! assert_eq!(count, Some(0));
//! assert_eq!(
//!     required.into_error().to_string(),
//!     "Missing required fields: email"
//! );
//! ```

use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use mercado_core::{CategoryId, Price, ProductId, Quantity, UserId};

/// Errors produced while validating a request payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// One or more required fields were missing.
    #[error("Missing required fields: {}", .0.join(", "))]
    Missing(Vec<&'static str>),

    /// A field was present but unusable.
    #[error("Invalid {field}: {reason}")]
    Invalid {
        /// Client-facing field name.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

impl ValidationError {
    /// Shorthand for [`ValidationError::Invalid`].
    #[must_use]
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Whether a supplied value counts as present.
pub trait Presence {
    /// `false` for values that should be treated as if they were absent.
    fn is_present(&self) -> bool;
}

impl Presence for String {
    fn is_present(&self) -> bool {
        !self.trim().is_empty()
    }
}

impl Presence for SecretString {
    fn is_present(&self) -> bool {
        !self.expose_secret().is_empty()
    }
}

macro_rules! always_present {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Presence for $ty {
                fn is_present(&self) -> bool {
                    true
                }
            }
        )*
    };
}

always_present!(i64, Decimal, Price, Quantity, CategoryId, ProductId, UserId);

/// Collects missing required fields.
#[derive(Debug, Default)]
pub struct Required {
    missing: Vec<&'static str>,
}

impl Required {
    /// Take a required value, noting `name` if it is missing.
    pub fn take<T: Presence>(&mut self, name: &'static str, value: Option<T>) -> Option<T> {
        let value = value.filter(Presence::is_present);
        if value.is_none() {
            self.missing.push(name);
        }
        value
    }

    /// Whether every field taken so far was present.
    #[must_use]
    pub fn is_satisfied(&self) -> bool {
        self.missing.is_empty()
    }

    /// The error describing every missing field.
    #[must_use]
    pub fn into_error(self) -> ValidationError {
        ValidationError::Missing(self.missing)
    }
}

/// Treat a blank optional string as absent.
#[must_use]
pub fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(Presence::is_present)
}

/// Check that an optional stock level is not negative.
///
/// # Errors
///
/// Returns `ValidationError::Invalid` for negative values.
pub fn check_stock(stock: Option<i64>) -> Result<Option<i64>, ValidationError> {
    match stock {
        Some(n) if n < 0 => Err(ValidationError::invalid("stock", "must not be negative")),
        other => Ok(other),
    }
}
