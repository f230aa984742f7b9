//! Order placement and lifecycle.

use chrono::{DateTime, Utc};
use tracing::{info, instrument};

use leafline_core::{EntityId, OrderId, OrderStatus, PaymentMethod, Price, ProductId, Role};

use crate::config::TaxConfig;
use crate::db::{OrderRepository, ProductRepository, RepositoryError};
use crate::models::{Actor, EntityKind, Order, OrderDraft, OrderItem, OrderTransitionError};
use crate::services::compliance::{ComplianceService, GateError};

/// One requested line: a product and how many units.
#[derive(Debug, Clone, Copy)]
pub struct LineRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// What a buyer submits.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub vendor_id: EntityId,
    pub items: Vec<LineRequest>,
    pub payment_method: PaymentMethod,
    pub shipping_address: String,
    pub shipping_cost: Price,
    pub delivery_date: Option<DateTime<Utc>>,
}

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("order {0} not found")]
    NotFound(OrderId),

    #[error("{kind} {id} not found")]
    EntityNotFound { kind: EntityKind, id: EntityId },

    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("invalid order: {0}")]
    Invalid(String),

    #[error(transparent)]
    Transition(#[from] OrderTransitionError),

    #[error(transparent)]
    Gate(GateError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl OrderError {
    fn from_gate(err: GateError, kind: EntityKind) -> Self {
        match err {
            GateError::NotFound(id) | GateError::WrongKind { id, .. } => {
                Self::EntityNotFound { kind, id }
            }
            GateError::Repository(e) => Self::Repository(e),
            other @ GateError::NonCompliant { .. } => Self::Gate(other),
        }
    }
}

/// Places orders and moves them through their lifecycle.
pub struct OrderService<'a> {
    products: ProductRepository<'a>,
    orders: OrderRepository<'a>,
    compliance: ComplianceService<'a>,
    tax: &'a TaxConfig,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(
        products: ProductRepository<'a>,
        orders: OrderRepository<'a>,
        compliance: ComplianceService<'a>,
        tax: &'a TaxConfig,
    ) -> Self {
        Self {
            products,
            orders,
            compliance,
            tax,
        }
    }

    /// Place an order on behalf of the actor's buyer business.
    ///
    /// Both the buyer and the vendor must pass the compliance check, the
    /// vendor's menu must be enabled, and each line must respect the
    /// product's order limits and available units. Items are priced at the
    /// current unit price.
    ///
    /// # Errors
    ///
    /// See [`OrderError`].
    #[instrument(skip(self, actor, request), fields(user_id = %actor.user_id, vendor_id = %request.vendor_id))]
    pub async fn place(&self, actor: &Actor, request: PlaceOrder) -> Result<Order, OrderError> {
        let buyer_id = match (actor.role, actor.entity_id) {
            (Role::Buyer, Some(id)) => id,
            _ => return Err(OrderError::Forbidden("Only buyers can place orders.")),
        };
        if request.items.is_empty() {
            return Err(OrderError::Invalid("at least one item is required".to_owned()));
        }
        if request.shipping_address.trim().is_empty() {
            return Err(OrderError::Invalid("shippingAddress is required".to_owned()));
        }

        let now = Utc::now();
        self.compliance
            .ensure_entity_active(buyer_id, Some(EntityKind::Buyer), now)
            .await
            .map_err(|e| OrderError::from_gate(e, EntityKind::Buyer))?;
        let vendor = self
            .compliance
            .ensure_entity_active(request.vendor_id, Some(EntityKind::Vendor), now)
            .await
            .map_err(|e| OrderError::from_gate(e, EntityKind::Vendor))?;

        if !vendor.as_vendor().is_some_and(|v| v.menu_enabled) {
            return Err(OrderError::Forbidden("Vendor is not accepting orders."));
        }

        let mut items = Vec::with_capacity(request.items.len());
        for line in &request.items {
            let product = self
                .products
                .get(line.product_id)
                .await?
                .filter(|p| p.vendor_id == request.vendor_id)
                .ok_or(OrderError::ProductNotFound(line.product_id))?;

            if !product.accepts_quantity(line.quantity) {
                return Err(OrderError::Invalid(format!(
                    "quantity {} of {} must be between {} and {} (available: {})",
                    line.quantity,
                    product.name,
                    product.min_order_quantity,
                    product.max_order_quantity,
                    product.available_units
                )));
            }

            items.push(OrderItem {
                product_id: product.id,
                quantity: line.quantity,
                price: product.price_per_unit,
            });
        }

        let order = Order::place(
            OrderDraft {
                buyer_id,
                vendor_id: request.vendor_id,
                items,
                payment_method: request.payment_method,
                shipping_address: request.shipping_address.trim().to_owned(),
                shipping_cost: request.shipping_cost,
                delivery_date: request.delivery_date,
            },
            self.tax,
            now,
        )
        .map_err(|_| OrderError::Invalid("order total is out of range".to_owned()))?;
        self.orders.create(&order).await?;

        info!(order_id = %order.id, total = %order.total_price, "Order placed");
        Ok(order)
    }

    /// Fetch an order visible to the actor.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if absent, `OrderError::Forbidden` if
    /// the actor is not a party to the order.
    pub async fn get(&self, actor: &Actor, id: OrderId) -> Result<Order, OrderError> {
        let order = self.orders.get(id).await?.ok_or(OrderError::NotFound(id))?;
        if !actor.is_admin() && !actor.entity_id.is_some_and(|e| order.involves(e)) {
            return Err(OrderError::Forbidden("You do not have access to this order."));
        }
        Ok(order)
    }

    /// Move an order to `next`.
    ///
    /// Vendors fulfil (accept, process, ship, deliver) and may cancel;
    /// buyers may cancel or confirm completion. Non-admin actors other than
    /// a cancelling party must pass the compliance check.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Transition` when the lifecycle forbids the move.
    #[instrument(skip(self, actor), fields(user_id = %actor.user_id))]
    pub async fn update_status(
        &self,
        actor: &Actor,
        id: OrderId,
        next: OrderStatus,
    ) -> Result<Order, OrderError> {
        let mut order = self.get(actor, id).await?;

        if !actor.is_admin() {
            let acting_as = actor.entity_id.and_then(|e| {
                if e == order.vendor_id {
                    Some(EntityKind::Vendor)
                } else if e == order.buyer_id {
                    Some(EntityKind::Buyer)
                } else {
                    None
                }
            });
            let allowed = match acting_as {
                Some(EntityKind::Vendor) => next != OrderStatus::Completed,
                Some(EntityKind::Buyer) => {
                    matches!(next, OrderStatus::Cancelled | OrderStatus::Completed)
                }
                None => false,
            };
            if !allowed {
                return Err(OrderError::Forbidden(
                    "You are not allowed to set this order status.",
                ));
            }

            if let (Some(kind), Some(entity)) = (acting_as, actor.entity_id)
                && next != OrderStatus::Cancelled
            {
                self.compliance
                    .ensure_entity_active(entity, Some(kind), Utc::now())
                    .await
                    .map_err(|e| OrderError::from_gate(e, kind))?;
            }
        }

        let from = order.status;
        order.advance(next, Utc::now())?;
        self.orders.update(&order).await?;

        info!(order_id = %id, %from, to = %next, "Order status updated");
        Ok(order)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use chrono::Duration;
    use leafline_core::{LicenseId, UserId};
    use rust_decimal::Decimal;

    use super::*;
    use crate::db::{EntityRepository, MemoryStore};
    use crate::models::{BusinessEntity, BusinessProfile, ContactInfo, Product};

    struct Fixture {
        store: MemoryStore,
        tax: TaxConfig,
        vendor: EntityId,
        buyer: EntityId,
        product: ProductId,
    }

    impl Fixture {
        async fn new() -> Self {
            let store = MemoryStore::new();
            let vendor = seed(&store, EntityKind::Vendor).await;
            let buyer = seed(&store, EntityKind::Buyer).await;

            let product = Product {
                id: ProductId::generate(),
                vendor_id: vendor,
                name: "Blue Dream".to_string(),
                description: String::new(),
                category: "Flower".to_string(),
                sub_category: String::new(),
                is_medical: false,
                price_per_unit: Price::from_cents(2_500),
                available_units: 30,
                min_order_quantity: 5,
                max_order_quantity: 50,
                coa_link: String::new(),
                compliance_tags: Vec::new(),
                updated_at: Utc::now(),
            };
            ProductRepository::new(&store).create(&product).await.unwrap();

            Self {
                store,
                tax: TaxConfig::default(),
                vendor,
                buyer,
                product: product.id,
            }
        }

        fn service(&self) -> OrderService<'_> {
            OrderService::new(
                ProductRepository::new(&self.store),
                OrderRepository::new(&self.store),
                ComplianceService::new(EntityRepository::new(&self.store)),
                &self.tax,
            )
        }

        fn actor(&self, role: Role) -> Actor {
            let entity_id = match role {
                Role::Vendor => Some(self.vendor),
                Role::Buyer => Some(self.buyer),
                Role::Admin => None,
            };
            Actor {
                user_id: UserId::generate(),
                role,
                entity_id,
            }
        }

        fn request(&self, quantity: u32) -> PlaceOrder {
            PlaceOrder {
                vendor_id: self.vendor,
                items: vec![LineRequest {
                    product_id: self.product,
                    quantity,
                }],
                payment_method: PaymentMethod::Cash,
                shipping_address: "500 Dispensary Way, Norman, OK".to_string(),
                shipping_cost: Price::from_cents(1_000),
                delivery_date: None,
            }
        }
    }

    async fn seed(store: &MemoryStore, kind: EntityKind) -> EntityId {
        let now = Utc::now();
        let mut entity = BusinessEntity::new(
            kind,
            BusinessProfile::pending(
                format!("{kind} Co"),
                LicenseId::parse(&format!("OMMA-{}", EntityId::generate())).unwrap(),
                ContactInfo::default(),
                now,
            ),
        );
        entity.mark_verified(now + Duration::days(90), now).unwrap();
        if let BusinessEntity::Vendor(v) = &mut entity {
            v.menu_enabled = true;
        }
        EntityRepository::new(store).create(&entity).await.unwrap();
        entity.id()
    }

    #[tokio::test]
    async fn test_place_order_prices_items() {
        let fx = Fixture::new().await;
        let order = fx
            .service()
            .place(&fx.actor(Role::Buyer), fx.request(10))
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.buyer_id, fx.buyer);
        // 10 x 25.00 = 250.00; excise 17.50; sales 11.25; shipping 10.00
        assert_eq!(order.subtotal.amount(), Decimal::from(250));
        assert_eq!(order.total_price.amount(), Decimal::from_str("288.75").unwrap());
    }

    #[tokio::test]
    async fn test_place_order_rejects_bad_quantities() {
        let fx = Fixture::new().await;
        let service = fx.service();
        let buyer = fx.actor(Role::Buyer);

        for qty in [1, 40] {
            let err = service.place(&buyer, fx.request(qty)).await.unwrap_err();
            assert!(matches!(err, OrderError::Invalid(_)), "qty {qty}: {err:?}");
        }
    }

    #[tokio::test]
    async fn test_place_order_rejects_out_of_range_shipping() {
        let fx = Fixture::new().await;
        let mut request = fx.request(10);
        request.shipping_cost = Price::new(Decimal::MAX).unwrap();

        let err = fx
            .service()
            .place(&fx.actor(Role::Buyer), request)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::Invalid(_)), "{err:?}");
    }

    #[tokio::test]
    async fn test_only_buyers_place_orders() {
        let fx = Fixture::new().await;
        let err = fx
            .service()
            .place(&fx.actor(Role::Vendor), fx.request(10))
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_non_compliant_vendor_blocks_order() {
        let fx = Fixture::new().await;
        let repo = EntityRepository::new(&fx.store);
        let mut vendor = repo.get(fx.vendor).await.unwrap().unwrap();
        vendor.profile_mut().license_expiration_date = Some(Utc::now() - Duration::days(1));
        repo.update(&vendor).await.unwrap();

        let err = fx
            .service()
            .place(&fx.actor(Role::Buyer), fx.request(10))
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::Gate(GateError::NonCompliant { .. })));
    }

    #[tokio::test]
    async fn test_lifecycle_permissions() {
        let fx = Fixture::new().await;
        let service = fx.service();
        let buyer = fx.actor(Role::Buyer);
        let vendor = fx.actor(Role::Vendor);
        let order = service.place(&buyer, fx.request(10)).await.unwrap();

        // Buyers cannot accept their own orders.
        let err = service
            .update_status(&buyer, order.id, OrderStatus::Accepted)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::Forbidden(_)));

        let accepted = service
            .update_status(&vendor, order.id, OrderStatus::Accepted)
            .await
            .unwrap();
        assert_eq!(accepted.status, OrderStatus::Accepted);

        let err = service
            .update_status(&vendor, order.id, OrderStatus::Delivered)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::Transition(_)));

        let cancelled = service
            .update_status(&buyer, order.id, OrderStatus::Cancelled)
            .await
            .unwrap();
        assert!(cancelled.order_status_timeline.cancelled_at.is_some());
    }

    #[tokio::test]
    async fn test_get_requires_party() {
        let fx = Fixture::new().await;
        let service = fx.service();
        let order = service
            .place(&fx.actor(Role::Buyer), fx.request(10))
            .await
            .unwrap();

        let stranger = Actor {
            user_id: UserId::generate(),
            role: Role::Buyer,
            entity_id: Some(EntityId::generate()),
        };
        assert!(matches!(
            service.get(&stranger, order.id).await,
            Err(OrderError::Forbidden(_))
        ));
        assert!(service.get(&fx.actor(Role::Admin), order.id).await.is_ok());
        assert!(matches!(
            service.get(&fx.actor(Role::Vendor), OrderId::generate()).await,
            Err(OrderError::NotFound(_))
        ));
    }
}
