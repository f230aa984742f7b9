//! Handlers shared by vendor and buyer registration.

use serde::Deserialize;

use leafline_core::{EntityId, LicenseId};

use crate::db::EntityRepository;
use crate::error::{AppError, Result};
use crate::models::{BusinessEntity, ContactInfo, EntityKind};
use crate::services::registration::{NewBusiness, RegistrationService};
use crate::state::AppState;

/// Registration request body for vendors and buyers.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub business_name: String,
    pub ok_state_license_id: String,
    #[serde(default)]
    pub contact_info: ContactInfo,
}

pub(super) async fn register(
    state: &AppState,
    kind: EntityKind,
    body: RegisterRequest,
) -> Result<BusinessEntity> {
    let license_id = LicenseId::parse(&body.ok_state_license_id)
        .map_err(|e| AppError::Validation(format!("okStateLicenseId: {e}")))?;

    let registration =
        RegistrationService::new(EntityRepository::new(state.store()), state.verifier());
    let entity = registration
        .register(
            kind,
            NewBusiness {
                business_name: body.business_name,
                license_id,
                contact_info: body.contact_info,
            },
        )
        .await?;
    Ok(entity)
}

pub(super) async fn show(state: &AppState, kind: EntityKind, raw_id: &str) -> Result<BusinessEntity> {
    let not_found = || AppError::NotFound(format!("{kind} not found"));
    let id: EntityId = super::parse_path_id(raw_id, &kind.to_string())?;
    EntityRepository::new(state.store())
        .get(id)
        .await?
        .filter(|entity| entity.kind() == kind)
        .ok_or_else(not_found)
}

pub(super) async fn reverify(
    state: &AppState,
    kind: EntityKind,
    raw_id: &str,
) -> Result<BusinessEntity> {
    let id: EntityId = super::parse_path_id(raw_id, &kind.to_string())?;
    let registration =
        RegistrationService::new(EntityRepository::new(state.store()), state.verifier());
    Ok(registration.reverify(kind, id).await?)
}
