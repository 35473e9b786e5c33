//! HTTP middleware stack for the API.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, transaction per route)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Body limit (applies to uploads)
//! 5. Bearer auth (product routes only)

pub mod auth;
pub mod request_id;

pub use auth::{AuthUser, require_bearer};
pub use request_id::request_id_middleware;
