//! HTTP route handlers for the marketplace API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                                - Greeting
//! GET  /health                          - Liveness
//! GET  /health/ready                    - Readiness (pings the store)
//!
//! # Auth
//! POST /auth/signup                     - Create account, returns token
//! POST /auth/login                      - Password login, returns token
//!
//! # Vendors
//! POST /vendors                         - Register with license verification
//! GET  /vendors/{id}                    - Vendor record
//! POST /vendors/{id}/verify             - Re-verify license
//! GET  /vendors/{id}/catalog            - Catalog (?category=)
//! PUT  /vendors/{id}/catalog/visibility - Toggle menu (requires auth)
//! POST /vendors/{id}/products           - Add product (requires auth)
//!
//! # Buyers
//! POST /buyers                          - Register with license verification
//! GET  /buyers/{id}                     - Buyer record
//! POST /buyers/{id}/verify              - Re-verify license
//!
//! # Users
//! POST /users                           - Provision a user account
//! GET  /users/me                        - Caller's profile (requires auth)
//!
//! # Orders (requires auth)
//! POST /orders                          - Place order
//! GET  /orders/{id}                     - Order detail
//! POST /orders/{id}/status              - Advance order status
//! ```

pub mod auth;
mod business;
pub mod buyers;
pub mod home;
pub mod orders;
pub mod users;
pub mod vendors;

use std::str::FromStr;

use axum::{
    Router,
    extract::Request,
    middleware,
    routing::{get, post, put},
};
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::middleware::request_id_middleware;
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
}

/// Create the vendor routes router.
pub fn vendor_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(vendors::register))
        .route("/{id}", get(vendors::show))
        .route("/{id}/verify", post(vendors::reverify))
        .route("/{id}/catalog", get(vendors::catalog))
        .route("/{id}/catalog/visibility", put(vendors::set_visibility))
        .route("/{id}/products", post(vendors::add_product))
}

/// Create the buyer routes router.
pub fn buyer_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(buyers::register))
        .route("/{id}", get(buyers::show))
        .route("/{id}/verify", post(buyers::reverify))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(orders::place))
        .route("/{id}", get(orders::show))
        .route("/{id}/status", post(orders::update_status))
}

/// Create all routes for the API.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/health", get(home::health))
        .route("/health/ready", get(home::readiness))
        .nest("/auth", auth_routes())
        .nest("/vendors", vendor_routes())
        .nest("/buyers", buyer_routes())
        .route("/users", post(users::create))
        .route("/users/me", get(users::me))
        .nest("/orders", order_routes())
}

/// The full application router with tracing and request ids.
///
/// The request span declares `request_id` and `user_id` so the request-id
/// middleware and the auth extractors can fill them in.
pub fn router(state: AppState) -> Router {
    let trace = TraceLayer::new_for_http().make_span_with(|request: &Request| {
        tracing::info_span!(
            "request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = tracing::field::Empty,
            user_id = tracing::field::Empty,
        )
    });

    routes()
        .layer(middleware::from_fn(request_id_middleware))
        .layer(trace)
        .with_state(state)
}

/// Parse a path id; anything unparseable is reported as not found.
fn parse_path_id<T: FromStr>(raw: &str, what: &str) -> Result<T, AppError> {
    raw.parse()
        .map_err(|_| AppError::NotFound(format!("{what} not found")))
}
