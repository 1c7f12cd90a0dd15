use super::{ItemId, OrderId, ProductId, UserId};
use crate::domain::money::{Money, Price};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Seconds after creation at which a pending order is considered shipped.
pub const SHIP_AFTER_SECS: i64 = 15;
/// Seconds after creation at which a shipped order is considered delivered.
pub const DELIVER_AFTER_SECS: i64 = 60;
/// Delivery estimate offset from creation, surfaced once an order leaves
/// the pending state.
pub const ESTIMATED_DELIVERY_DAYS: i64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Paid,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Terminal statuses never change again, not even via auto-advance.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::Paid => "PAID",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
        };
        f.write_str(s)
    }
}

/// Immutable snapshot of one ordered line. Name and price are copied from the
/// cart at placement time so later catalog edits cannot rewrite history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: ItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Price,
}

impl OrderItem {
    pub fn subtotal(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

/// An order: immutable item set, mutable status, owned by one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    pub total_amount: Money,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn new(
        id: OrderId,
        user_id: UserId,
        items: Vec<OrderItem>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let total_amount = items.iter().map(OrderItem::subtotal).sum();
        Self {
            id,
            user_id,
            items,
            total_amount,
            status: OrderStatus::Pending,
            created_at,
        }
    }
}

/// Lazy status auto-advance, recomputed from `created_at` on every read.
///
/// Pending orders ship after [`SHIP_AFTER_SECS`] and shipped orders deliver
/// after [`DELIVER_AFTER_SECS`]; the two checks run in sequence, so a stale
/// pending order can advance straight through to delivered in a single read.
/// Terminal statuses are left untouched. Recomputing from the creation time
/// (rather than accumulating deltas) makes concurrent advancement idempotent.
pub fn advanced_status(
    status: OrderStatus,
    created_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> OrderStatus {
    if status.is_terminal() {
        return status;
    }

    let elapsed = now.signed_duration_since(created_at);
    let mut status = status;
    if status == OrderStatus::Pending && elapsed >= Duration::seconds(SHIP_AFTER_SECS) {
        status = OrderStatus::Shipped;
    }
    if status == OrderStatus::Shipped && elapsed >= Duration::seconds(DELIVER_AFTER_SECS) {
        status = OrderStatus::Delivered;
    }
    status
}

/// Derived delivery estimate: absent while pending or cancelled, otherwise
/// three days from creation. Never stored.
pub fn estimated_delivery_date(
    status: OrderStatus,
    created_at: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    match status {
        OrderStatus::Pending | OrderStatus::Cancelled => None,
        _ => Some(created_at + Duration::days(ESTIMATED_DELIVERY_DAYS)),
    }
}
