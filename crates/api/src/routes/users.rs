//! User provisioning.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use leafline_core::UserId;

use crate::db::{EntityRepository, UserRepository};
use crate::error::{ApiJson, AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::UserProfile;
use crate::services::accounts::{AccountService, NewUser};
use crate::services::compliance::ComplianceService;
use crate::state::AppState;

/// User creation body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub email: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub role: String,
    #[serde(default)]
    pub associated_entity_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserResponse {
    pub message: &'static str,
    pub user_id: UserId,
}

/// Create a user tied to a compliant business, or an allow-listed admin.
pub async fn create(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CreateUserRequest>,
) -> Result<Json<CreateUserResponse>> {
    let store = state.store();
    let accounts = AccountService::new(
        UserRepository::new(store),
        ComplianceService::new(EntityRepository::new(store)),
        state.config(),
    );

    let user = accounts
        .create_user(NewUser {
            email: body.email,
            password: body.password,
            first_name: body.first_name,
            last_name: body.last_name,
            role: body.role,
            associated_entity_id: body.associated_entity_id,
        })
        .await?;

    Ok(Json(CreateUserResponse {
        message: "User account created successfully.",
        user_id: user.id,
    }))
}

/// The caller's own profile.
pub async fn me(
    State(state): State<AppState>,
    RequireAuth(actor): RequireAuth,
) -> Result<Json<UserProfile>> {
    let user = UserRepository::new(state.store())
        .get_by_id(actor.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_owned()))?;
    Ok(Json(UserProfile::from(&user)))
}
