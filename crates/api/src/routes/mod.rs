//! HTTP route handlers for the API.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                  - Liveness check
//! GET    /health/ready            - Readiness check (store ping)
//! GET    /uploads/{file}          - Stored product images
//!
//! # Users
//! POST   /users/signup            - Create an account
//! POST   /users/login             - Exchange credentials for a bearer token
//!
//! # Products (bearer token required)
//! GET    /products                - List products
//! POST   /products                - Create a product (JSON or multipart)
//! GET    /products/category/{id}  - List products in a category
//! GET    /products/history        - Caller's orders, newest first
//! POST   /products/checkout       - Place an order
//! GET    /products/{id}           - Show a product
//! PUT    /products/{id}           - Partially update a product
//! DELETE /products/{id}           - Delete a product
//! ```

pub mod orders;
pub mod products;
pub mod users;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
};
use serde::Serialize;
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::middleware::{request_id_middleware, require_bearer};
use crate::state::AppState;

/// Success body: `{"status": 201, "message": "...", ...data}`.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub status: u16,
    pub message: &'static str,
    #[serde(flatten)]
    pub data: T,
}

/// Envelope payload for responses that carry nothing beyond the message.
#[derive(Debug, Serialize)]
pub struct NoData {}

/// Build a success response with its status echoed in the body.
pub fn reply<T: Serialize>(
    status: StatusCode,
    message: &'static str,
    data: T,
) -> (StatusCode, Json<Envelope<T>>) {
    (
        status,
        Json(Envelope {
            status: status.as_u16(),
            message,
            data,
        }),
    )
}

/// Create the user routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(users::signup))
        .route("/login", post(users::login))
}

/// Create the product routes router. Every route requires a bearer token.
pub fn product_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(products::list).post(products::create))
        .route("/category/{id}", get(products::list_by_category))
        .route("/history", get(orders::history))
        .route("/checkout", post(orders::checkout))
        .route(
            "/{id}",
            get(products::show)
                .put(products::update)
                .delete(products::delete),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer))
}

/// Create the full application router, without the Sentry layers.
pub fn router(state: AppState) -> Router {
    let max_upload_bytes = state.config().max_upload_bytes;
    let uploads = ServeDir::new(state.images().dir());

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/users", user_routes())
        .nest("/products", product_routes(&state))
        .nest_service("/uploads", uploads)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the store does not answer.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.db().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
