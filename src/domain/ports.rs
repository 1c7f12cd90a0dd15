use super::cart::Cart;
use super::money::Money;
use super::order::{Order, OrderStatus};
use super::payment::Payment;
use super::product::{Product, UserProfile};
use super::{OrderId, ProductId, UserId};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// The inventory ledger: per-product available quantity with atomic
/// check-and-decrement. Implementations must serialize reservations so two
/// concurrent callers can never drive a quantity below zero.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Current available quantity. `None` means no record exists, which
    /// callers treat as out of stock rather than zero with auto-creation.
    async fn available(&self, product_id: ProductId) -> Result<Option<u32>>;

    /// Atomic check-then-decrement for a single product.
    async fn reserve(&self, product_id: ProductId, quantity: u32) -> Result<()>;

    /// All-or-nothing reservation across several lines; a failure on any line
    /// leaves every quantity untouched.
    async fn reserve_all(&self, lines: &[(ProductId, u32)]) -> Result<()>;

    /// Additive compensation for cancellations and rolled-back placements.
    async fn release(&self, product_id: ProductId, quantity: u32) -> Result<()>;

    async fn release_all(&self, lines: &[(ProductId, u32)]) -> Result<()>;

    /// Absolute set used by the inventory-management collaborator; creates
    /// the record when missing.
    async fn set_quantity(&self, product_id: ProductId, quantity: u32) -> Result<()>;
}

#[async_trait]
pub trait CartStore: Send + Sync {
    async fn get(&self, user_id: UserId) -> Result<Option<Cart>>;
    async fn put(&self, cart: Cart) -> Result<()>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Allocates the next order id. Ids are unique and monotonically
    /// increasing per store.
    async fn next_id(&self) -> Result<OrderId>;
    async fn put(&self, order: Order) -> Result<()>;
    async fn get(&self, order_id: OrderId) -> Result<Option<Order>>;
    /// All orders for a user, most recent first.
    async fn for_user(&self, user_id: UserId) -> Result<Vec<Order>>;
    /// Every order in the store, in id order. Used for final reporting.
    async fn all(&self) -> Result<Vec<Order>>;
    async fn delete(&self, order_id: OrderId) -> Result<()>;
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Upserts the payment for its order (1:1 by order id).
    async fn put(&self, payment: Payment) -> Result<()>;
    async fn get_by_order(&self, order_id: OrderId) -> Result<Option<Payment>>;
}

/// Read-only catalog collaborator.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn get_product(&self, product_id: ProductId) -> Result<Option<Product>>;
}

/// User/identity collaborator used to resolve the acting principal and the
/// notification address.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user(&self, user_id: UserId) -> Result<Option<UserProfile>>;
    async fn find_by_username(&self, username: &str) -> Result<Option<UserProfile>>;
}

/// Notification collaborator. Calls are fire-and-forget from the engines'
/// point of view: failures are logged by the caller and never propagate.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_order_confirmation(&self, to: &str, order_id: OrderId, amount: Money)
    -> Result<()>;
    async fn send_status_update(
        &self,
        to: &str,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<()>;
}

pub type InventoryStoreRef = Arc<dyn InventoryStore>;
pub type CartStoreRef = Arc<dyn CartStore>;
pub type OrderStoreRef = Arc<dyn OrderStore>;
pub type PaymentStoreRef = Arc<dyn PaymentStore>;
pub type CatalogRef = Arc<dyn Catalog>;
pub type UserDirectoryRef = Arc<dyn UserDirectory>;
pub type NotifierRef = Arc<dyn Notifier>;
