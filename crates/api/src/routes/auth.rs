//! Signup and login.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

use leafline_core::UserId;

use crate::db::{EntityRepository, UserRepository};
use crate::error::{ApiJson, Result};
use crate::services::accounts::{AccountService, NewUser};
use crate::services::auth::AuthService;
use crate::services::compliance::ComplianceService;
use crate::state::AppState;

/// Signup request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub role: String,
    #[serde(default)]
    pub associated_entity_id: Option<String>,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupResponse {
    pub message: String,
    pub user_id: UserId,
    pub token: String,
}

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
}

/// Create an account and sign it in.
pub async fn signup(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>)> {
    let store = state.store();
    let accounts = AccountService::new(
        UserRepository::new(store),
        ComplianceService::new(EntityRepository::new(store)),
        state.config(),
    );

    let user = accounts
        .sign_up(NewUser {
            email: body.email,
            password: Some(body.password),
            first_name: body.first_name,
            last_name: body.last_name,
            role: body.role,
            associated_entity_id: body.associated_entity_id,
        })
        .await?;
    let token = state.tokens().issue(&user)?;

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            message: format!(
                "User {} successfully created as a {}.",
                user.email, user.role
            ),
            user_id: user.id,
            token,
        }),
    ))
}

/// Exchange email and password for an access token.
pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let auth = AuthService::new(UserRepository::new(state.store()));
    let user = auth.login_with_password(&body.email, &body.password).await?;
    let token = state.tokens().issue(&user)?;

    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(LoginResponse {
        message: format!("Welcome back, {}. Successfully logged in.", user.email),
        token,
    }))
}
