//! Bearer token extractors.
//!
//! Tokens are issued by `/auth/signup` and `/auth/login` and sent as
//! `Authorization: Bearer <jwt>`.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::error::{AppError, set_sentry_user};
use crate::models::Actor;
use crate::state::AppState;

/// Extractor that requires a valid access token.
///
/// ```rust,ignore
/// async fn handler(RequireAuth(actor): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", actor.user_id)
/// }
/// ```
pub struct RequireAuth(pub Actor);

/// Extractor that accepts anonymous callers.
///
/// A present but invalid token is still rejected.
pub struct OptionalAuth(pub Option<Actor>);

fn bearer_token(parts: &Parts) -> Result<Option<&str>, AppError> {
    let Some(value) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    value
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(Some)
        .ok_or_else(|| AppError::Unauthorized("Malformed Authorization header".to_owned()))
}

fn authenticate(parts: &Parts, state: &AppState) -> Result<Option<Actor>, AppError> {
    let Some(token) = bearer_token(parts)? else {
        return Ok(None);
    };
    let actor = state.tokens().verify(token)?;
    tracing::Span::current().record("user_id", actor.user_id.to_string());
    set_sentry_user(&actor.user_id);
    Ok(Some(actor))
}

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        authenticate(parts, state)?
            .map(Self)
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_owned()))
    }
}

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        authenticate(parts, state).map(Self)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts(auth: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/orders");
        if let Some(value) = auth {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token(&parts(None)).unwrap(), None);
        assert_eq!(
            bearer_token(&parts(Some("Bearer abc.def.ghi"))).unwrap(),
            Some("abc.def.ghi")
        );
        assert!(bearer_token(&parts(Some("Basic dXNlcg=="))).is_err());
        assert!(bearer_token(&parts(Some("Bearer "))).is_err());
    }
}
