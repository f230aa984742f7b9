//! Integration tests for the Leafline marketplace API.
//!
//! Tests drive the full router in-process with `tower::ServiceExt::oneshot`
//! against the in-memory document store and the sandbox licensing authority,
//! so no database or network is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p leafline-integration-tests
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! #[tokio::test]
//! async fn test_health() {
//!     let app = TestApp::new();
//!     let response = app.get("/health", None).await;
//!     assert_eq!(response.status, StatusCode::OK);
//! }
//! ```

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use secrecy::SecretString;
use serde_json::{Value, json};
use tower::ServiceExt;

use leafline_api::config::MarketplaceConfig;
use leafline_api::db::MemoryStore;
use leafline_api::routes;
use leafline_api::state::AppState;

/// Signing secret used by every test app.
pub const TEST_JWT_SECRET: &str = "integration-test-secret-6f1c9a2e4b7d8035";

/// Sandbox license ids.
pub const ACTIVE_VENDOR_LICENSE: &str = "OMMA-ACTIVE-VENDOR";
pub const ACTIVE_BUYER_LICENSE: &str = "OMMA-ACTIVE-BUYER";
pub const EXPIRED_LICENSE: &str = "OMMA-EXPIRED";
pub const FAILING_LICENSE: &str = "OMMA-FAIL";

/// Default local configuration for tests.
#[must_use]
pub fn test_config() -> MarketplaceConfig {
    MarketplaceConfig::local(SecretString::from(TEST_JWT_SECRET))
}

/// A status code and decoded body.
///
/// Non-JSON bodies are returned as `Value::String`.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestResponse {
    /// The `error` message of an error response.
    #[must_use]
    pub fn error(&self) -> &str {
        self.body["error"].as_str().unwrap_or_default()
    }

    /// A string field of the body.
    ///
    /// # Panics
    ///
    /// Panics if the field is missing or not a string.
    #[must_use]
    pub fn str_field(&self, field: &str) -> String {
        self.body[field]
            .as_str()
            .unwrap_or_else(|| panic!("missing `{field}` in {}", self.body))
            .to_owned()
    }
}

/// The API router over a fresh in-memory store.
#[derive(Clone)]
pub struct TestApp {
    router: Router,
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApp {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    /// # Panics
    ///
    /// Panics if application state cannot be built from `config`.
    #[must_use]
    pub fn with_config(config: MarketplaceConfig) -> Self {
        let state = AppState::new(config, Arc::new(MemoryStore::new()))
            .expect("Failed to build application state");
        Self {
            router: routes::router(state),
        }
    }

    /// Send a request with an optional JSON body and bearer token.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or the router fails.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<&Value>,
        token: Option<&str>,
    ) -> TestResponse {
        let body = body.map(Value::to_string);
        self.send(method, uri, body, token).await
    }

    /// Send a request with a raw body, sent as `application/json`.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or the router fails.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        body: Option<String>,
        token: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if body.is_some() {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
        }
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = builder
            .body(body.map_or_else(Body::empty, Body::from))
            .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Router failed");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));

        TestResponse { status, body }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::GET, uri, None, token).await
    }

    pub async fn post(&self, uri: &str, body: &Value, token: Option<&str>) -> TestResponse {
        self.request(Method::POST, uri, Some(body), token).await
    }

    pub async fn put(&self, uri: &str, body: &Value, token: Option<&str>) -> TestResponse {
        self.request(Method::PUT, uri, Some(body), token).await
    }

    /// Register a vendor and return its id.
    ///
    /// # Panics
    ///
    /// Panics if registration does not succeed.
    pub async fn register_vendor(&self, license: &str) -> String {
        let response = self
            .post(
                "/vendors",
                &json!({
                    "businessName": "Green Harvest Farms",
                    "okStateLicenseId": license,
                }),
                None,
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.body);
        response.str_field("vendorId")
    }

    /// Register a buyer and return its id.
    ///
    /// # Panics
    ///
    /// Panics if registration does not succeed.
    pub async fn register_buyer(&self, license: &str) -> String {
        let response = self
            .post(
                "/buyers",
                &json!({
                    "businessName": "Friendly Market",
                    "okStateLicenseId": license,
                }),
                None,
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.body);
        response.str_field("buyerId")
    }

    /// Sign up a user for an entity and return the access token.
    ///
    /// # Panics
    ///
    /// Panics if signup does not succeed.
    pub async fn sign_up(&self, email: &str, role: &str, entity_id: &str) -> String {
        let response = self
            .post(
                "/auth/signup",
                &json!({
                    "email": email,
                    "password": "correct horse battery",
                    "role": role,
                    "associatedEntityId": entity_id,
                    "firstName": "Wes",
                    "lastName": "Winston",
                }),
                None,
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.str_field("token")
    }
}
