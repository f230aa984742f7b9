//! Vendor registration, catalog, and product endpoints.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use leafline_core::{EntityId, Price};

use super::business::{self, RegisterRequest};
use crate::db::{EntityRepository, ProductRepository};
use crate::error::{ApiJson, Result};
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::models::{BusinessEntity, Catalog, EntityKind, Product, Vendor};
use crate::services::catalog::{CatalogService, NewProduct};
use crate::services::compliance::ComplianceService;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub message: &'static str,
    pub vendor_id: EntityId,
}

/// Catalog query parameters.
#[derive(Debug, Deserialize)]
pub struct CatalogQuery {
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibilityRequest {
    pub menu_enabled: bool,
}

/// Product registration body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub sub_category: String,
    #[serde(default)]
    pub is_medical: bool,
    pub price_per_unit: Price,
    pub available_units: u32,
    #[serde(default = "default_min_quantity")]
    pub min_order_quantity: u32,
    pub max_order_quantity: u32,
    #[serde(default)]
    pub coa_link: String,
    #[serde(default)]
    pub compliance_tags: Vec<String>,
}

const fn default_min_quantity() -> u32 {
    1
}

impl From<ProductRequest> for NewProduct {
    fn from(body: ProductRequest) -> Self {
        Self {
            name: body.name,
            description: body.description,
            category: body.category,
            sub_category: body.sub_category,
            is_medical: body.is_medical,
            price_per_unit: body.price_per_unit,
            available_units: body.available_units,
            min_order_quantity: body.min_order_quantity,
            max_order_quantity: body.max_order_quantity,
            coa_link: body.coa_link,
            compliance_tags: body.compliance_tags,
        }
    }
}

fn catalog_service(state: &AppState) -> CatalogService<'_> {
    let store = state.store();
    CatalogService::new(
        EntityRepository::new(store),
        ProductRepository::new(store),
        ComplianceService::new(EntityRepository::new(store)),
    )
}

/// Register a vendor after verifying its license with the state.
pub async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> Result<Json<RegisterResponse>> {
    let entity = business::register(&state, EntityKind::Vendor, body).await?;
    Ok(Json(RegisterResponse {
        message: "Vendor registration successful. Please proceed to create your user account.",
        vendor_id: entity.id(),
    }))
}

pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<BusinessEntity>> {
    business::show(&state, EntityKind::Vendor, &id).await.map(Json)
}

/// Re-verify a vendor's license.
pub async fn reverify(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<BusinessEntity>> {
    business::reverify(&state, EntityKind::Vendor, &id)
        .await
        .map(Json)
}

/// A vendor's catalog as seen by the caller.
pub async fn catalog(
    State(state): State<AppState>,
    OptionalAuth(viewer): OptionalAuth,
    Path(id): Path<String>,
    Query(query): Query<CatalogQuery>,
) -> Result<Json<Catalog>> {
    let vendor_id: EntityId = super::parse_path_id(&id, "Vendor")?;
    let catalog = catalog_service(&state)
        .catalog(vendor_id, query.category.as_deref(), viewer.as_ref())
        .await?;
    Ok(Json(catalog))
}

/// Turn the vendor's menu on or off.
pub async fn set_visibility(
    State(state): State<AppState>,
    RequireAuth(actor): RequireAuth,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<VisibilityRequest>,
) -> Result<Json<Vendor>> {
    let vendor_id: EntityId = super::parse_path_id(&id, "Vendor")?;
    let vendor = catalog_service(&state)
        .set_visibility(&actor, vendor_id, body.menu_enabled)
        .await?;
    Ok(Json(vendor))
}

/// Add a product to the vendor's catalog.
pub async fn add_product(
    State(state): State<AppState>,
    RequireAuth(actor): RequireAuth,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<ProductRequest>,
) -> Result<(StatusCode, Json<Product>)> {
    let vendor_id: EntityId = super::parse_path_id(&id, "Vendor")?;
    let product = catalog_service(&state)
        .add_product(&actor, vendor_id, body.into())
        .await?;
    Ok((StatusCode::CREATED, Json(product)))
}
