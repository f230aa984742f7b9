//! Unified error handling with Sentry integration.
//!
//! Route handlers return `Result<T, AppError>`. Service errors convert into
//! `AppError`, which picks the HTTP status and a client-safe message and
//! responds with `{"error": "<message>"}`. Server-side failures are captured
//! to Sentry before responding.

use axum::{
    Json,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::accounts::AccountError;
use crate::services::auth::AuthError;
use crate::services::catalog::CatalogError;
use crate::services::compliance::GateError;
use crate::services::license::VerifyError;
use crate::services::orders::OrderError;
use crate::services::registration::RegistrationError;

/// Application-level error type for the marketplace API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Malformed or invalid input.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A license or compliance check failed.
    #[error("Compliance error: {0}")]
    Compliance(String),

    /// The caller may not perform this action.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The licensing authority failed.
    #[error("External service error: {0}")]
    ExternalService(String),

    /// A dependency is temporarily unavailable.
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Request conflicts with existing state.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Missing or invalid credentials.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Compliance(_) | Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::ExternalService(_) => StatusCode::BAD_GATEWAY,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if matches!(
            self,
            Self::Database(_) | Self::Internal(_) | Self::ExternalService(_)
        ) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = self.status();

        // Don't expose internal error details to clients
        let message = match self {
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_owned(),
            Self::Validation(msg)
            | Self::Compliance(msg)
            | Self::Forbidden(msg)
            | Self::ExternalService(msg)
            | Self::ServiceUnavailable(msg)
            | Self::NotFound(msg)
            | Self::Conflict(msg)
            | Self::Unauthorized(msg) => msg,
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// JSON body extractor that rejects malformed payloads with a 400
/// `{"error": "Invalid request payload"}`.
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> std::result::Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|e| {
            tracing::debug!(error = %e, "Rejected request payload");
            AppError::Validation("Invalid request payload".to_owned())
        })?;
        Ok(Self(value))
    }
}

impl From<VerifyError> for AppError {
    fn from(err: VerifyError) -> Self {
        match err {
            VerifyError::Inactive(_) | VerifyError::Expired(_) => Self::Compliance(
                "License verification failed or license is inactive/expired.".to_owned(),
            ),
            VerifyError::ExternalService(_) => Self::ExternalService(
                "License verification service is unavailable. Please try again later.".to_owned(),
            ),
            VerifyError::CircuitOpen => Self::ServiceUnavailable(
                "License verification is temporarily unavailable. Please try again later."
                    .to_owned(),
            ),
        }
    }
}

impl From<GateError> for AppError {
    fn from(err: GateError) -> Self {
        match err {
            GateError::NotFound(_) | GateError::WrongKind { .. } => {
                Self::NotFound("Business entity not found".to_owned())
            }
            GateError::NonCompliant { .. } => {
                Self::Compliance("Entity license is not active or has expired.".to_owned())
            }
            GateError::Repository(e) => Self::Database(e),
        }
    }
}

impl From<RegistrationError> for AppError {
    fn from(err: RegistrationError) -> Self {
        match err {
            RegistrationError::Invalid(msg) => Self::Validation(msg),
            RegistrationError::Verification(e) => e.into(),
            RegistrationError::AlreadyRegistered(_) => {
                Self::Conflict("A business with this license is already registered.".to_owned())
            }
            RegistrationError::NotFound { kind, .. } => Self::NotFound(format!("{kind} not found")),
            RegistrationError::Transition(e) => Self::Conflict(e.to_string()),
            RegistrationError::Repository(e) => Self::Database(e),
        }
    }
}

impl From<AccountError> for AppError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::InvalidRole(_) => {
                Self::Validation("Invalid user role specified.".to_owned())
            }
            AccountError::MissingEntity => Self::Validation(
                "Associated entity ID is required for VENDOR and BUYER roles.".to_owned(),
            ),
            AccountError::InvalidEmail(_) => Self::Validation("Invalid email address".to_owned()),
            AccountError::PasswordRequired => Self::Validation("Password is required.".to_owned()),
            AccountError::WeakPassword(msg) => Self::Validation(msg),
            AccountError::EntityRejected(_) => Self::Compliance(
                "Cannot create user: Associated business entity is invalid or non-compliant."
                    .to_owned(),
            ),
            AccountError::AdminNotAllowed => {
                Self::Forbidden("Admin accounts must be provisioned internally.".to_owned())
            }
            AccountError::EmailTaken => {
                Self::Conflict("An account with this email already exists".to_owned())
            }
            AccountError::PasswordHash => Self::Internal("password hashing failed".to_owned()),
            AccountError::Repository(e) => Self::Database(e),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => Self::Unauthorized("Invalid credentials".to_owned()),
            AuthError::InvalidToken => {
                Self::Unauthorized("Invalid or expired access token".to_owned())
            }
            AuthError::AccountInactive => Self::Forbidden("Account is not active.".to_owned()),
            AuthError::InvalidEmail(_) => Self::Validation("Invalid email address".to_owned()),
            AuthError::WeakPassword(msg) => Self::Validation(msg),
            AuthError::Repository(e) => Self::Database(e),
            AuthError::TokenSigning(e) => Self::Internal(format!("token signing error: {e}")),
            AuthError::PasswordHash => Self::Internal("password hashing error".to_owned()),
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::VendorNotFound(_) => Self::NotFound("Vendor not found".to_owned()),
            CatalogError::Forbidden(msg) => Self::Forbidden(msg.to_owned()),
            CatalogError::Invalid(msg) => Self::Validation(msg),
            CatalogError::Gate(e) => e.into(),
            CatalogError::Repository(e) => Self::Database(e),
        }
    }
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::NotFound(_) => Self::NotFound("Order not found".to_owned()),
            OrderError::EntityNotFound { kind, .. } => Self::NotFound(format!("{kind} not found")),
            OrderError::ProductNotFound(_) => Self::NotFound("Product not found".to_owned()),
            OrderError::Forbidden(msg) => Self::Forbidden(msg.to_owned()),
            OrderError::Invalid(msg) => Self::Validation(msg),
            OrderError::Transition(e) => Self::Conflict(e.to_string()),
            OrderError::Gate(e) => e.into(),
            OrderError::Repository(e) => Self::Database(e),
        }
    }
}

/// Set the Sentry user context for the authenticated caller.
pub fn set_sentry_user(user_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}
