//! Integration tests for Mercado.
//!
//! Every test drives the full API router in-process against a private
//! in-memory `SQLite` store and a temporary upload directory, so no server
//! or database needs to be running.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p mercado-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `users` - Signup and login
//! - `auth` - Bearer token enforcement
//! - `products` - Catalog CRUD and image uploads
//! - `orders` - Checkout and order history

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::missing_panics_doc, clippy::unwrap_used)]

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use secrecy::SecretString;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;
use url::Url;

use mercado_api::config::ApiConfig;
use mercado_api::db::Database;
use mercado_api::routes;
use mercado_api::state::AppState;

/// Signing secret used by every test app.
pub const TOKEN_SECRET: &str = "Xq7#mP2$vL9@wR4!kT8&nB3*zF6^hJ1%cY5";

/// Base URL image links are built from.
pub const BASE_URL: &str = "http://shop.test/";

/// Multipart boundary used by [`multipart_body`].
pub const BOUNDARY: &str = "mercado-test-boundary";

/// Largest response body the helpers will read.
const MAX_BODY: usize = 1024 * 1024;

/// A running app: the router plus the resources it owns.
pub struct TestApp {
    router: Router,
    state: AppState,
    uploads: TempDir,
}

/// Status and parsed JSON body of a response. Non-JSON bodies parse as
/// `Value::String`.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestApp {
    /// Build an app with a fresh store and upload directory.
    pub async fn new() -> Self {
        let uploads = tempfile::tempdir().unwrap();

        let config = ApiConfig {
            database_url: SecretString::from("sqlite::memory:"),
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
            public_base_url: Url::parse(BASE_URL).unwrap(),
            token_secret: SecretString::from(TOKEN_SECRET),
            upload_dir: uploads.path().to_path_buf(),
            max_upload_bytes: 5 * 1024 * 1024,
            statement_timeout: Duration::from_secs(5),
            log_json: false,
            sentry_dsn: None,
            sentry_environment: None,
        };

        let db = Database::in_memory(config.statement_timeout).await.unwrap();
        db.init_schema().await.unwrap();

        let state = AppState::new(config, db);
        let router = routes::router(state.clone());

        Self {
            router,
            state,
            uploads,
        }
    }

    /// Shared application state, for inspecting the store directly.
    #[must_use]
    pub const fn state(&self) -> &AppState {
        &self.state
    }

    /// Directory uploaded images are written to.
    #[must_use]
    pub fn upload_dir(&self) -> &std::path::Path {
        self.uploads.path()
    }

    /// Send a raw request.
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), MAX_BODY).await.unwrap();
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        TestResponse { status, body }
    }

    /// Send a JSON request, optionally with a bearer token.
    pub async fn json(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: &Value,
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    /// Send a bodyless request, optionally with a bearer token.
    pub async fn call(&self, method: Method, uri: &str, token: Option<&str>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    /// Send a multipart request with a bearer token.
    pub async fn multipart(
        &self,
        method: Method,
        uri: &str,
        token: &str,
        body: Vec<u8>,
    ) -> TestResponse {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    /// Sign up a user and return its id.
    pub async fn signup(&self, name: &str, email: &str, password: &str) -> i64 {
        let res = self
            .json(
                Method::POST,
                "/users/signup",
                None,
                &json!({"name": name, "email": email, "password": password}),
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "{:?}", res.body);
        res.body["id"].as_i64().unwrap()
    }

    /// Log a user in and return the bearer token.
    pub async fn login(&self, email: &str, password: &str) -> String {
        let res = self
            .json(
                Method::POST,
                "/users/login",
                None,
                &json!({"email": email, "password": password}),
            )
            .await;
        assert_eq!(res.status, StatusCode::OK, "{:?}", res.body);
        res.body["token"].as_str().unwrap().to_string()
    }

    /// Sign up and log in a fresh user, returning its id and token.
    pub async fn user(&self, email: &str) -> (i64, String) {
        let id = self.signup("Test User", email, "correct horse").await;
        let token = self.login(email, "correct horse").await;
        (id, token)
    }

    /// Create a product from JSON and return its id.
    pub async fn create_product(&self, token: &str, product: &Value) -> i64 {
        let res = self
            .json(Method::POST, "/products", Some(token), product)
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "{:?}", res.body);
        res.body["id"].as_i64().unwrap()
    }
}

/// A multipart part: text field or file.
pub enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        bytes: &'a [u8],
    },
}

/// Encode parts as a `multipart/form-data` body delimited by [`BOUNDARY`].
#[must_use]
pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                        .as_bytes(),
                );
            }
            Part::File {
                name,
                file_name,
                content_type,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
                body.extend_from_slice(b"\r\n");
            }
        }
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}
