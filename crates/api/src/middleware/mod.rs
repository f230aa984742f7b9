//! HTTP middleware and extractors.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request span)
//! 3. Request ID (add unique ID to each request)

pub mod auth;
pub mod request_id;

pub use auth::{OptionalAuth, RequireAuth};
pub use request_id::{RequestId, request_id_middleware};
