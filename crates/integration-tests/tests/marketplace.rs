//! Catalog, products, and the order lifecycle.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use serde_json::{Value, json};

use leafline_integration_tests::{ACTIVE_BUYER_LICENSE, ACTIVE_VENDOR_LICENSE, TestApp};

struct Market {
    app: TestApp,
    vendor_id: String,
    vendor_token: String,
    buyer_id: String,
    buyer_token: String,
}

async fn market() -> Market {
    let app = TestApp::new();
    let vendor_id = app.register_vendor(ACTIVE_VENDOR_LICENSE).await;
    let buyer_id = app.register_buyer(ACTIVE_BUYER_LICENSE).await;
    let vendor_token = app.sign_up("val@farm.com", "VENDOR", &vendor_id).await;
    let buyer_token = app.sign_up("bri@friendlymarket.net", "BUYER", &buyer_id).await;
    Market {
        app,
        vendor_id,
        vendor_token,
        buyer_id,
        buyer_token,
    }
}

fn product_body(name: &str, category: &str) -> Value {
    json!({
        "name": name,
        "category": category,
        "subCategory": "Indica",
        "pricePerUnit": "25.00",
        "availableUnits": 100,
        "minOrderQuantity": 5,
        "maxOrderQuantity": 50,
        "complianceTags": ["THC < 0.3%"],
    })
}

impl Market {
    async fn add_product(&self, name: &str, category: &str) -> String {
        let response = self
            .app
            .post(
                &format!("/vendors/{}/products", self.vendor_id),
                &product_body(name, category),
                Some(&self.vendor_token),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.str_field("id")
    }

    async fn open_menu(&self) {
        let response = self
            .app
            .put(
                &format!("/vendors/{}/catalog/visibility", self.vendor_id),
                &json!({"menuEnabled": true}),
                Some(&self.vendor_token),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    }

    async fn place_order(&self, product_id: &str, quantity: u32) -> Value {
        let response = self
            .app
            .post(
                "/orders",
                &json!({
                    "vendorId": self.vendor_id,
                    "items": [{"productId": product_id, "quantity": quantity}],
                    "paymentMethod": "CHECK",
                    "shippingAddress": "1 Main St, Tulsa, OK",
                    "shippingCost": "10.00",
                }),
                Some(&self.buyer_token),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body
    }

    async fn set_status(&self, order_id: &str, status: &str, token: &str) -> StatusCode {
        self.app
            .post(
                &format!("/orders/{order_id}/status"),
                &json!({"status": status}),
                Some(token),
            )
            .await
            .status
    }
}

#[tokio::test]
async fn test_add_product_requires_auth() {
    let m = market().await;
    let response = m
        .app
        .post(
            &format!("/vendors/{}/products", m.vendor_id),
            &product_body("Blue Dream", "Flower"),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let bad_token = m
        .app
        .post(
            &format!("/vendors/{}/products", m.vendor_id),
            &product_body("Blue Dream", "Flower"),
            Some("not-a-jwt"),
        )
        .await;
    assert_eq!(bad_token.status, StatusCode::UNAUTHORIZED);
    assert_eq!(bad_token.error(), "Invalid or expired access token");
}

#[tokio::test]
async fn test_buyer_cannot_add_vendor_products() {
    let m = market().await;
    let response = m
        .app
        .post(
            &format!("/vendors/{}/products", m.vendor_id),
            &product_body("Blue Dream", "Flower"),
            Some(&m.buyer_token),
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_catalog_visibility() {
    let m = market().await;
    m.add_product("Blue Dream", "Flower").await;
    m.add_product("Gummies", "Edible").await;
    let catalog_uri = format!("/vendors/{}/catalog", m.vendor_id);

    // Hidden from buyers until the menu is enabled.
    let hidden = m.app.get(&catalog_uri, Some(&m.buyer_token)).await;
    assert_eq!(hidden.status, StatusCode::OK);
    assert_eq!(hidden.body["totalProducts"], 0);

    // The owner always sees the full catalog.
    let own = m.app.get(&catalog_uri, Some(&m.vendor_token)).await;
    assert_eq!(own.body["totalProducts"], 2);

    m.open_menu().await;

    let anonymous = m.app.get(&catalog_uri, None).await;
    assert_eq!(anonymous.body["totalProducts"], 2);

    let flower = m
        .app
        .get(&format!("{catalog_uri}?category=flower"), None)
        .await;
    assert_eq!(flower.body["totalProducts"], 1);
    assert_eq!(flower.body["filterApplied"], "flower");
    assert_eq!(flower.body["products"][0]["name"], "Blue Dream");
}

#[tokio::test]
async fn test_order_totals() {
    let m = market().await;
    let product_id = m.add_product("Blue Dream", "Flower").await;
    m.open_menu().await;

    let order = m.place_order(&product_id, 10).await;
    assert_eq!(order["status"], "PENDING");
    assert_eq!(order["buyerId"], Value::String(m.buyer_id.clone()));
    assert_eq!(order["subTotal"], "250.00");
    assert_eq!(order["exciseTax"], "17.50");
    assert_eq!(order["salesTax"], "11.25");
    assert_eq!(order["totalPrice"], "288.75");
    assert_eq!(order["paymentStatus"], "PENDING");
}

#[tokio::test]
async fn test_order_rejects_out_of_range_quantity() {
    let m = market().await;
    let product_id = m.add_product("Blue Dream", "Flower").await;
    m.open_menu().await;

    let response = m
        .app
        .post(
            "/orders",
            &json!({
                "vendorId": m.vendor_id,
                "items": [{"productId": product_id, "quantity": 2}],
                "shippingAddress": "1 Main St, Tulsa, OK",
            }),
            Some(&m.buyer_token),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_order_rejects_out_of_range_amounts() {
    let m = market().await;
    let product_id = m.add_product("Blue Dream", "Flower").await;
    m.open_menu().await;

    let response = m
        .app
        .post(
            "/orders",
            &json!({
                "vendorId": m.vendor_id,
                "items": [{"productId": product_id, "quantity": 10}],
                "shippingAddress": "1 Main St, Tulsa, OK",
                "shippingCost": "79228162514264337593543950335",
            }),
            Some(&m.buyer_token),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST, "{}", response.body);
    assert!(response.error().contains("out of range"), "{}", response.body);

    let mut product = product_body("Gold Standard", "Flower");
    product["pricePerUnit"] = json!("79228162514264337593543950335");
    let response = m
        .app
        .post(
            &format!("/vendors/{}/products", m.vendor_id),
            &product,
            Some(&m.vendor_token),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST, "{}", response.body);
}

#[tokio::test]
async fn test_closed_menu_refuses_orders() {
    let m = market().await;
    let product_id = m.add_product("Blue Dream", "Flower").await;

    let response = m
        .app
        .post(
            "/orders",
            &json!({
                "vendorId": m.vendor_id,
                "items": [{"productId": product_id, "quantity": 10}],
                "shippingAddress": "1 Main St, Tulsa, OK",
            }),
            Some(&m.buyer_token),
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_vendor_cannot_place_orders() {
    let m = market().await;
    let product_id = m.add_product("Blue Dream", "Flower").await;
    m.open_menu().await;

    let response = m
        .app
        .post(
            "/orders",
            &json!({
                "vendorId": m.vendor_id,
                "items": [{"productId": product_id, "quantity": 10}],
                "shippingAddress": "1 Main St, Tulsa, OK",
            }),
            Some(&m.vendor_token),
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_order_lifecycle() {
    let m = market().await;
    let product_id = m.add_product("Blue Dream", "Flower").await;
    m.open_menu().await;
    let order = m.place_order(&product_id, 10).await;
    let order_id = order["id"].as_str().unwrap();

    // Both parties can read the order; strangers need a token.
    let uri = format!("/orders/{order_id}");
    assert_eq!(m.app.get(&uri, Some(&m.buyer_token)).await.status, StatusCode::OK);
    assert_eq!(m.app.get(&uri, Some(&m.vendor_token)).await.status, StatusCode::OK);
    assert_eq!(m.app.get(&uri, None).await.status, StatusCode::UNAUTHORIZED);

    assert_eq!(
        m.set_status(order_id, "ACCEPTED", &m.vendor_token).await,
        StatusCode::OK
    );
    // Buyers do not move fulfilment along.
    assert_eq!(
        m.set_status(order_id, "PROCESSING", &m.buyer_token).await,
        StatusCode::FORBIDDEN
    );
    // Skipping a step is a lifecycle conflict.
    assert_eq!(
        m.set_status(order_id, "SHIPPED", &m.vendor_token).await,
        StatusCode::CONFLICT
    );
    assert_eq!(
        m.set_status(order_id, "CANCELLED", &m.buyer_token).await,
        StatusCode::OK
    );

    let cancelled = m.app.get(&uri, Some(&m.buyer_token)).await;
    assert_eq!(cancelled.body["status"], "CANCELLED");
    assert!(cancelled.body["orderStatusTimeline"]["cancelledAt"].is_string());
}

#[tokio::test]
async fn test_unknown_order_is_not_found() {
    let m = market().await;
    let response = m
        .app
        .get(
            "/orders/6c1f3e4a-2b5d-4a7e-9f10-1a2b3c4d5e6f",
            Some(&m.buyer_token),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.error(), "Order not found");
}
