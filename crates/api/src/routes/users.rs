//! Signup and login.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use mercado_core::UserId;

use super::reply;
use crate::error::Result;
use crate::extract::ApiJson;
use crate::services::auth::AuthService;
use crate::state::AppState;
use crate::validation::Required;

/// Signup request body.
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    #[serde(alias = "nome")]
    pub name: Option<String>,
    pub email: Option<String>,
    #[serde(alias = "senha")]
    pub password: Option<String>,
}

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    #[serde(alias = "senha")]
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
struct Created {
    id: UserId,
}

#[derive(Debug, Serialize)]
struct Token {
    token: String,
}

/// Handle signup.
pub async fn signup(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<SignupRequest>,
) -> Result<impl IntoResponse> {
    let mut required = Required::default();
    let name = required.take("name", body.name);
    let email = required.take("email", body.email);
    let password = required.take("password", body.password.map(SecretString::from));
    let (Some(name), Some(email), Some(password)) = (name, email, password) else {
        return Err(required.into_error().into());
    };

    let id = AuthService::new(state.db(), state.tokens())
        .signup(&name, &email, password)
        .await?;

    Ok(reply(StatusCode::CREATED, "User created", Created { id }))
}

/// Handle login.
pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse> {
    let mut required = Required::default();
    let email = required.take("email", body.email);
    let password = required.take("password", body.password.map(SecretString::from));
    let (Some(email), Some(password)) = (email, password) else {
        return Err(required.into_error().into());
    };

    let (_user, token) = AuthService::new(state.db(), state.tokens())
        .login(&email, password)
        .await?;

    Ok(reply(StatusCode::OK, "Login successful", Token { token }))
}
