//! Order placement and lifecycle.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use leafline_core::{EntityId, OrderId, OrderStatus, PaymentMethod, Price, ProductId};

use crate::db::{EntityRepository, OrderRepository, ProductRepository};
use crate::error::{ApiJson, Result};
use crate::middleware::RequireAuth;
use crate::models::Order;
use crate::services::compliance::ComplianceService;
use crate::services::orders::{LineRequest, OrderService, PlaceOrder};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Order placement body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub vendor_id: EntityId,
    pub items: Vec<OrderLine>,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    pub shipping_address: String,
    #[serde(default)]
    pub shipping_cost: Option<Price>,
    #[serde(default)]
    pub delivery_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: OrderStatus,
}

fn order_service(state: &AppState) -> OrderService<'_> {
    let store = state.store();
    OrderService::new(
        ProductRepository::new(store),
        OrderRepository::new(store),
        ComplianceService::new(EntityRepository::new(store)),
        &state.config().tax,
    )
}

/// Place an order as the caller's buyer business.
pub async fn place(
    State(state): State<AppState>,
    RequireAuth(actor): RequireAuth,
    ApiJson(body): ApiJson<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<Order>)> {
    let request = PlaceOrder {
        vendor_id: body.vendor_id,
        items: body
            .items
            .into_iter()
            .map(|line| LineRequest {
                product_id: line.product_id,
                quantity: line.quantity,
            })
            .collect(),
        payment_method: body.payment_method,
        shipping_address: body.shipping_address,
        shipping_cost: body.shipping_cost.unwrap_or(Price::ZERO),
        delivery_date: body.delivery_date,
    };
    let order = order_service(&state).place(&actor, request).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn show(
    State(state): State<AppState>,
    RequireAuth(actor): RequireAuth,
    Path(id): Path<String>,
) -> Result<Json<Order>> {
    let id: OrderId = super::parse_path_id(&id, "Order")?;
    Ok(Json(order_service(&state).get(&actor, id).await?))
}

/// Move an order to its next status.
pub async fn update_status(
    State(state): State<AppState>,
    RequireAuth(actor): RequireAuth,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<StatusRequest>,
) -> Result<Json<Order>> {
    let id: OrderId = super::parse_path_id(&id, "Order")?;
    let order = order_service(&state)
        .update_status(&actor, id, body.status)
        .await?;
    Ok(Json(order))
}
