//! Orders placed by buyers against a vendor's catalog.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use leafline_core::{
    EntityId, OrderId, OrderStatus, PaymentMethod, PaymentStatus, Price, PriceError, ProductId,
};

use crate::config::TaxConfig;

/// Attempted order status change the lifecycle does not allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("order cannot move from {from} to {to}")]
pub struct OrderTransitionError {
    pub from: OrderStatus,
    pub to: OrderStatus,
}

/// One line of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: ProductId,
    pub quantity: u32,
    /// Unit price captured when the order was placed.
    pub price: Price,
}

impl OrderItem {
    /// Unit price times quantity, or `None` on overflow.
    #[must_use]
    pub fn line_total(&self) -> Option<Price> {
        self.price.checked_times(self.quantity)
    }
}

/// When the order reached each status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timeline {
    pub placed_at: DateTime<Utc>,
    #[serde(default)]
    pub accepted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub processing_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub shipped_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub delivered_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cancelled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Timeline {
    const fn placed(at: DateTime<Utc>) -> Self {
        Self {
            placed_at: at,
            accepted_at: None,
            processing_at: None,
            shipped_at: None,
            delivered_at: None,
            cancelled_at: None,
            completed_at: None,
        }
    }

    fn record(&mut self, status: OrderStatus, at: DateTime<Utc>) {
        let slot = match status {
            OrderStatus::Pending => return,
            OrderStatus::Accepted => &mut self.accepted_at,
            OrderStatus::Processing => &mut self.processing_at,
            OrderStatus::Shipped => &mut self.shipped_at,
            OrderStatus::Delivered => &mut self.delivered_at,
            OrderStatus::Cancelled => &mut self.cancelled_at,
            OrderStatus::Completed => &mut self.completed_at,
        };
        *slot = Some(at);
    }
}

/// Monetary breakdown of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Totals {
    pub subtotal: Price,
    pub excise_tax: Price,
    pub sales_tax: Price,
    pub total: Price,
}

impl Totals {
    /// Both taxes apply to the item subtotal; shipping is untaxed.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Overflow` if any amount leaves the decimal range.
    pub fn compute(
        items: &[OrderItem],
        shipping: Price,
        tax: &TaxConfig,
    ) -> Result<Self, PriceError> {
        let lines = items
            .iter()
            .map(OrderItem::line_total)
            .collect::<Option<Vec<_>>>()
            .ok_or(PriceError::Overflow)?;
        let subtotal = Price::checked_sum(lines).ok_or(PriceError::Overflow)?.rounded();
        let excise_tax = subtotal
            .checked_apply_rate(tax.excise_rate)
            .ok_or(PriceError::Overflow)?;
        let sales_tax = subtotal
            .checked_apply_rate(tax.sales_rate)
            .ok_or(PriceError::Overflow)?;
        let total = Price::checked_sum([subtotal, excise_tax, sales_tax, shipping.rounded()])
            .ok_or(PriceError::Overflow)?;
        Ok(Self {
            subtotal,
            excise_tax,
            sales_tax,
            total,
        })
    }
}

/// What a buyer submits when placing an order.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub buyer_id: EntityId,
    pub vendor_id: EntityId,
    pub items: Vec<OrderItem>,
    pub payment_method: PaymentMethod,
    pub shipping_address: String,
    pub shipping_cost: Price,
    pub delivery_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub buyer_id: EntityId,
    pub vendor_id: EntityId,
    pub status: OrderStatus,
    pub order_status_timeline: Timeline,
    pub items: Vec<OrderItem>,
    #[serde(rename = "subTotal")]
    pub subtotal: Price,
    pub excise_tax: Price,
    pub sales_tax: Price,
    pub shipping_cost: Price,
    pub total_price: Price,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub shipping_address: String,
    #[serde(default)]
    pub delivery_date: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Price a draft and open it as a pending order.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Overflow` if the draft cannot be priced.
    pub fn place(
        draft: OrderDraft,
        tax: &TaxConfig,
        now: DateTime<Utc>,
    ) -> Result<Self, PriceError> {
        let totals = Totals::compute(&draft.items, draft.shipping_cost, tax)?;
        Ok(Self {
            id: OrderId::generate(),
            buyer_id: draft.buyer_id,
            vendor_id: draft.vendor_id,
            status: OrderStatus::Pending,
            order_status_timeline: Timeline::placed(now),
            items: draft.items,
            subtotal: totals.subtotal,
            excise_tax: totals.excise_tax,
            sales_tax: totals.sales_tax,
            shipping_cost: draft.shipping_cost.rounded(),
            total_price: totals.total,
            payment_status: PaymentStatus::Pending,
            payment_method: draft.payment_method,
            shipping_address: draft.shipping_address,
            delivery_date: draft.delivery_date,
            updated_at: now,
        })
    }

    /// Move the order to `next`, stamping the timeline.
    ///
    /// # Errors
    ///
    /// Returns `OrderTransitionError` when the lifecycle forbids the move.
    pub fn advance(
        &mut self,
        next: OrderStatus,
        now: DateTime<Utc>,
    ) -> Result<(), OrderTransitionError> {
        if !self.status.can_transition_to(next) {
            return Err(OrderTransitionError {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.order_status_timeline.record(next, now);
        self.updated_at = now;
        Ok(())
    }

    /// Whether `entity` is the buyer or vendor on this order.
    #[must_use]
    pub fn involves(&self, entity: EntityId) -> bool {
        self.buyer_id == entity || self.vendor_id == entity
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use rust_decimal::Decimal;

    use super::*;

    fn item(cents: u32, quantity: u32) -> OrderItem {
        OrderItem {
            product_id: ProductId::generate(),
            quantity,
            price: Price::from_cents(cents),
        }
    }

    fn draft(items: Vec<OrderItem>) -> OrderDraft {
        OrderDraft {
            buyer_id: EntityId::generate(),
            vendor_id: EntityId::generate(),
            items,
            payment_method: PaymentMethod::Check,
            shipping_address: "123 Main St, Tulsa, OK".to_string(),
            shipping_cost: Price::from_cents(1_500),
            delivery_date: None,
        }
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_totals() {
        // 10 x $25.00 + 3 x $12.50 = $287.50
        let items = vec![item(2_500, 10), item(1_250, 3)];
        let totals =
            Totals::compute(&items, Price::from_cents(1_500), &TaxConfig::default()).unwrap();

        assert_eq!(totals.subtotal.amount(), dec("287.50"));
        // 7% of 287.50 = 20.125 -> 20.13
        assert_eq!(totals.excise_tax.amount(), dec("20.13"));
        // 4.5% of 287.50 = 12.9375 -> 12.94
        assert_eq!(totals.sales_tax.amount(), dec("12.94"));
        assert_eq!(totals.total.amount(), dec("335.57"));
    }

    #[test]
    fn test_totals_out_of_range() {
        let tax = TaxConfig::default();
        let max = Price::new(Decimal::MAX).unwrap();

        let huge_line = OrderItem {
            product_id: ProductId::generate(),
            quantity: 2,
            price: max,
        };
        assert_eq!(
            Totals::compute(&[huge_line], Price::ZERO, &tax),
            Err(PriceError::Overflow)
        );
        assert_eq!(
            Totals::compute(&[item(2_500, 10)], max, &tax),
            Err(PriceError::Overflow)
        );

        let mut huge_shipping = draft(vec![item(1_000, 5)]);
        huge_shipping.shipping_cost = max;
        assert_eq!(
            Order::place(huge_shipping, &tax, Utc::now()),
            Err(PriceError::Overflow)
        );
    }

    #[test]
    fn test_place_opens_pending_order() {
        let now = Utc::now();
        let order = Order::place(draft(vec![item(1_000, 5)]), &TaxConfig::default(), now)
            .unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_status, PaymentStatus::Pending);
        assert_eq!(order.order_status_timeline.placed_at, now);
        assert_eq!(order.subtotal.amount(), dec("50.00"));
    }

    #[test]
    fn test_advance_stamps_timeline() {
        let now = Utc::now();
        let mut order = Order::place(draft(vec![item(1_000, 5)]), &TaxConfig::default(), now)
            .unwrap();

        order.advance(OrderStatus::Accepted, now).unwrap();
        assert_eq!(order.order_status_timeline.accepted_at, Some(now));

        let err = order.advance(OrderStatus::Delivered, now).unwrap_err();
        assert_eq!(err.from, OrderStatus::Accepted);
        assert_eq!(order.status, OrderStatus::Accepted);

        order.advance(OrderStatus::Cancelled, now).unwrap();
        assert!(order.status.is_terminal());
        assert!(order.order_status_timeline.cancelled_at.is_some());
    }

    #[test]
    fn test_wire_shape() {
        let order =
            Order::place(draft(vec![item(1_000, 5)]), &TaxConfig::default(), Utc::now()).unwrap();
        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["status"], "PENDING");
        assert_eq!(json["paymentMethod"], "CHECK");
        assert!(json.get("subTotal").is_some());
        assert!(json["orderStatusTimeline"].get("placedAt").is_some());
    }
}
