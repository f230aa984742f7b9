//! Buyer registration endpoints.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;

use leafline_core::EntityId;

use super::business::{self, RegisterRequest};
use crate::error::{ApiJson, Result};
use crate::models::{BusinessEntity, EntityKind};
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub message: &'static str,
    pub buyer_id: EntityId,
}

/// Register a buyer after verifying its license with the state.
pub async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> Result<Json<RegisterResponse>> {
    let entity = business::register(&state, EntityKind::Buyer, body).await?;
    Ok(Json(RegisterResponse {
        message: "Buyer registration successful. Please proceed to create your user account.",
        buyer_id: entity.id(),
    }))
}

pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<BusinessEntity>> {
    business::show(&state, EntityKind::Buyer, &id).await.map(Json)
}

pub async fn reverify(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<BusinessEntity>> {
    business::reverify(&state, EntityKind::Buyer, &id)
        .await
        .map(Json)
}
