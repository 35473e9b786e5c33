//! Bearer token authentication.
//!
//! [`require_bearer`] guards the product routes:
//!
//! | Request                                   | Outcome |
//! |-------------------------------------------|---------|
//! | no `Authorization` header                 | 401     |
//! | header not `Bearer <token>`               | 401     |
//! | token fails verification (or has expired) | 403     |
//! | token verifies                            | handler runs with [`AuthUser`] |

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};

use mercado_core::UserId;

use crate::error::{AppError, set_sentry_user};
use crate::state::AppState;

/// Identity of the caller, inserted by [`require_bearer`].
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(user: AuthUser) -> impl IntoResponse {
///     format!("Hello, user {}!", user.user_id)
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    /// The user the bearer token was issued to.
    pub user_id: UserId,
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Only reachable without a token if a route skipped the middleware.
        parts
            .extensions
            .get::<Self>()
            .copied()
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))
    }
}

/// Middleware that verifies the bearer token and attaches [`AuthUser`].
///
/// # Errors
///
/// Returns `AppError::Unauthorized` for a missing or malformed header and
/// `AppError::Forbidden` for a token that does not verify.
pub async fn require_bearer(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers())?;

    let user_id = state
        .tokens()
        .verify(token)
        .and_then(|claims| claims.user_id())
        .map_err(|_| AppError::Forbidden("Invalid or expired token".to_string()))?;

    set_sentry_user(&user_id);
    request.extensions_mut().insert(AuthUser { user_id });

    Ok(next.run(request).await)
}

/// Pull the token out of `Authorization: Bearer <token>`.
fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthorized("Missing authorization header".to_string()))?;

    let malformed = || AppError::Unauthorized("Malformed authorization header".to_string());

    let header = header.to_str().map_err(|_| malformed())?;
    let (scheme, token) = header.split_once(' ').ok_or_else(malformed)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(malformed());
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(malformed());
    }

    Ok(token)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, StatusCode};

    fn headers(value: &[u8]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_bytes(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_extracted() {
        assert_eq!(bearer_token(&headers(b"Bearer abc.def.ghi")).unwrap(), "abc.def.ghi");
        assert_eq!(bearer_token(&headers(b"bearer  abc ")).unwrap(), "abc");
    }

    #[test]
    fn test_missing_header_is_unauthorized() {
        let err = bearer_token(&HeaderMap::new()).unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_malformed_header_is_unauthorized() {
        for value in [
            b"Basic dXNlcjpwYXNz".as_slice(),
            b"Bearer",
            b"Bearer    ",
            b"abc.def.ghi",
            b"Bearer \xff\xfe",
        ] {
            let err = bearer_token(&headers(value)).unwrap_err();
            assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        }
    }
}
