//! Greeting and health endpoints.

use axum::{Json, extract::State, http::StatusCode};
use serde_json::{Value, json};

use crate::state::AppState;

/// Greeting for anyone hitting the root.
pub async fn home() -> &'static str {
    "Welcome to the Leafline B2B marketplace API."
}

/// Liveness check.
pub async fn health() -> &'static str {
    "API is up and running!"
}

/// Readiness check.
///
/// Returns 503 when the document store does not answer. An open licensing
/// authority circuit is reported but does not fail readiness.
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let authority = if state.verifier().is_circuit_open() {
        "degraded"
    } else {
        "ok"
    };

    match state.store().ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({"store": "ok", "licenseAuthority": authority})),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"store": "unavailable", "licenseAuthority": authority})),
            )
        }
    }
}
