use crate::domain::cart::Cart;
use crate::domain::money::{Money, Price};
use crate::domain::order::{Order, OrderItem, OrderStatus, advanced_status, estimated_delivery_date};
use crate::domain::ports::{
    CartStoreRef, InventoryStoreRef, NotifierRef, OrderStoreRef, UserDirectoryRef,
};
use crate::domain::{ItemId, OrderId, ProductId, UserId};
use crate::error::{CommerceError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Rendered in place of a line item whose product snapshot is unusable, so
/// one bad row never breaks the whole order view.
pub const CORRUPTED_ITEM_PLACEHOLDER: &str = "Corrupted Item Data";

/// Caller-facing view of one order line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderItemView {
    pub id: ItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Price,
    pub subtotal: Money,
}

impl From<&OrderItem> for OrderItemView {
    fn from(item: &OrderItem) -> Self {
        if item.product_name.trim().is_empty() {
            return Self {
                id: item.id,
                product_id: item.product_id,
                product_name: CORRUPTED_ITEM_PLACEHOLDER.to_string(),
                quantity: item.quantity,
                unit_price: item.unit_price,
                subtotal: Money::ZERO,
            };
        }
        Self {
            id: item.id,
            product_id: item.product_id,
            product_name: item.product_name.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
            subtotal: item.subtotal(),
        }
    }
}

/// Caller-facing view of an order, with the derived delivery estimate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderView {
    pub id: OrderId,
    pub user_id: UserId,
    pub items: Vec<OrderItemView>,
    pub total_amount: Money,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub estimated_delivery_date: Option<DateTime<Utc>>,
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id,
            user_id: order.user_id,
            items: order.items.iter().map(OrderItemView::from).collect(),
            total_amount: order.total_amount,
            status: order.status,
            created_at: order.created_at,
            estimated_delivery_date: estimated_delivery_date(order.status, order.created_at),
        }
    }
}

/// Converts carts into immutable orders and owns the order status lifecycle.
pub struct OrderEngine {
    orders: OrderStoreRef,
    carts: CartStoreRef,
    inventory: InventoryStoreRef,
    users: UserDirectoryRef,
    notifier: NotifierRef,
}

impl OrderEngine {
    pub fn new(
        orders: OrderStoreRef,
        carts: CartStoreRef,
        inventory: InventoryStoreRef,
        users: UserDirectoryRef,
        notifier: NotifierRef,
    ) -> Self {
        Self {
            orders,
            carts,
            inventory,
            users,
            notifier,
        }
    }

    /// Commits the user's cart into a pending order.
    ///
    /// Reserves every line atomically, snapshots the items, persists the
    /// order and clears the cart. A failure after the reservation step
    /// releases every reserved quantity before surfacing the error, so a
    /// failed placement never leaves a partial inventory decrement behind.
    /// The confirmation notification runs after the commit and its failure
    /// is swallowed.
    pub async fn place_order(&self, user_id: UserId) -> Result<OrderView> {
        let user = self
            .users
            .find_user(user_id)
            .await?
            .ok_or(CommerceError::NotFound("user"))?;

        let mut cart = match self.carts.get(user_id).await? {
            Some(cart) if !cart.is_empty() => cart,
            _ => {
                return Err(CommerceError::InvalidState(
                    "cannot place order with empty cart".to_string(),
                ));
            }
        };

        let lines: Vec<(ProductId, u32)> = cart
            .items
            .iter()
            .map(|item| (item.product_id, item.quantity))
            .collect();
        self.inventory.reserve_all(&lines).await?;

        let order = match self.commit_order(&mut cart, user_id).await {
            Ok(order) => order,
            Err(err) => {
                // Compensate: the reservation already went through.
                if let Err(release_err) = self.inventory.release_all(&lines).await {
                    tracing::warn!(user_id, error = %release_err, "failed to release reservations");
                }
                return Err(err);
            }
        };

        if let Err(err) = self
            .notifier
            .send_order_confirmation(&user.email, order.id, order.total_amount)
            .await
        {
            tracing::warn!(order_id = order.id, error = %err, "order confirmation not sent");
        }

        Ok(OrderView::from(&order))
    }

    /// The user's orders, most recent first, with statuses auto-advanced.
    pub async fn get_user_orders(&self, user_id: UserId) -> Result<Vec<OrderView>> {
        let now = Utc::now();
        let mut views = Vec::new();
        for mut order in self.orders.for_user(user_id).await? {
            self.auto_advance(&mut order, now).await;
            views.push(OrderView::from(&order));
        }
        Ok(views)
    }

    /// A single order, owner-only, with its status auto-advanced.
    pub async fn get_order(&self, order_id: OrderId, user_id: UserId) -> Result<OrderView> {
        let mut order = self
            .orders
            .get(order_id)
            .await?
            .ok_or(CommerceError::NotFound("order"))?;
        if order.user_id != user_id {
            return Err(CommerceError::Forbidden(
                "order does not belong to user".to_string(),
            ));
        }

        self.auto_advance(&mut order, Utc::now()).await;
        Ok(OrderView::from(&order))
    }

    async fn commit_order(&self, cart: &mut Cart, user_id: UserId) -> Result<Order> {
        let order_id = self.orders.next_id().await?;
        let items = cart
            .items
            .iter()
            .enumerate()
            .map(|(index, item)| OrderItem {
                id: index as ItemId + 1,
                product_id: item.product_id,
                product_name: item.product_name.clone(),
                quantity: item.quantity,
                unit_price: item.unit_price,
            })
            .collect();
        let order = Order::new(order_id, user_id, items, Utc::now());

        self.orders.put(order.clone()).await?;

        cart.clear();
        if let Err(err) = self.carts.put(cart.clone()).await {
            // Unwind the half-committed placement before reporting.
            if let Err(delete_err) = self.orders.delete(order_id).await {
                tracing::warn!(order_id, error = %delete_err, "failed to delete unwound order");
            }
            return Err(err);
        }

        Ok(order)
    }

    /// Applies the lazy status advance and persists it best-effort; a
    /// persistence failure is logged and the advanced in-memory state is
    /// still returned to the caller.
    async fn auto_advance(&self, order: &mut Order, now: DateTime<Utc>) {
        let advanced = advanced_status(order.status, order.created_at, now);
        if advanced == order.status {
            return;
        }
        order.status = advanced;
        if let Err(err) = self.orders.put(order.clone()).await {
            tracing::warn!(order_id = order.id, error = %err, "failed to persist status advance");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{DELIVER_AFTER_SECS, SHIP_AFTER_SECS};
    use crate::domain::ports::{InventoryStore, OrderStore};
    use crate::domain::product::{Product, UserProfile};
    use crate::infrastructure::in_memory::{
        InMemoryCartStore, InMemoryCatalog, InMemoryInventoryStore, InMemoryOrderStore,
        InMemoryUserDirectory,
    };
    use crate::infrastructure::notify::LogNotifier;
    use chrono::Duration;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    struct World {
        engine: OrderEngine,
        cart_service: crate::application::cart::CartService,
        inventory: Arc<InMemoryInventoryStore>,
        orders: Arc<InMemoryOrderStore>,
    }

    async fn world() -> World {
        let inventory = Arc::new(InMemoryInventoryStore::new());
        let carts = Arc::new(InMemoryCartStore::new());
        let orders = Arc::new(InMemoryOrderStore::new());
        let catalog = InMemoryCatalog::new();
        let users = InMemoryUserDirectory::new();

        catalog
            .add_product(Product::new(1, "Mouse", dec!(10.00).try_into().unwrap()))
            .await;
        catalog
            .add_product(Product::new(2, "Keyboard", dec!(5.00).try_into().unwrap()))
            .await;
        users
            .add_user(UserProfile {
                id: 1,
                username: "ada".to_string(),
                email: "ada@example.com".to_string(),
            })
            .await;
        inventory.set_quantity(1, 10).await.unwrap();
        inventory.set_quantity(2, 10).await.unwrap();

        let catalog = Arc::new(catalog);
        let users = Arc::new(users);
        let cart_service = crate::application::cart::CartService::new(
            carts.clone(),
            inventory.clone(),
            catalog,
            users.clone(),
        );
        let engine = OrderEngine::new(
            orders.clone(),
            carts,
            inventory.clone(),
            users,
            Arc::new(LogNotifier::new()),
        );

        World {
            engine,
            cart_service,
            inventory,
            orders,
        }
    }

    #[tokio::test]
    async fn test_place_order_totals_and_clears_cart() {
        let world = world().await;
        world.cart_service.add_item(1, 1, 2).await.unwrap();
        world.cart_service.add_item(1, 2, 1).await.unwrap();

        let view = world.engine.place_order(1).await.unwrap();
        assert_eq!(view.total_amount, Money::new(dec!(25.00)));
        assert_eq!(view.status, OrderStatus::Pending);
        assert_eq!(view.estimated_delivery_date, None);

        assert!(world.cart_service.get_or_create(1).await.unwrap().is_empty());
        assert_eq!(world.inventory.available(1).await.unwrap(), Some(8));
        assert_eq!(world.inventory.available(2).await.unwrap(), Some(9));
    }

    #[tokio::test]
    async fn test_place_order_empty_cart() {
        let world = world().await;
        assert!(matches!(
            world.engine.place_order(1).await,
            Err(CommerceError::InvalidState(_))
        ));

        world.cart_service.get_or_create(1).await.unwrap();
        assert!(matches!(
            world.engine.place_order(1).await,
            Err(CommerceError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_placement_leaves_inventory_untouched() {
        let world = world().await;
        world.cart_service.add_item(1, 1, 2).await.unwrap();
        world.cart_service.add_item(1, 2, 3).await.unwrap();

        // Stock for the second line shrinks between add and placement.
        world.inventory.set_quantity(2, 1).await.unwrap();

        let err = world.engine.place_order(1).await.unwrap_err();
        assert!(matches!(
            err,
            CommerceError::InsufficientStock {
                product: 2,
                available: 1
            }
        ));

        // No partial decrement on any line, and the cart survives.
        assert_eq!(world.inventory.available(1).await.unwrap(), Some(10));
        assert_eq!(world.inventory.available(2).await.unwrap(), Some(1));
        assert_eq!(
            world.cart_service.get_or_create(1).await.unwrap().items.len(),
            2
        );
    }

    #[tokio::test]
    async fn test_get_order_ownership_and_presence() {
        let world = world().await;
        world.cart_service.add_item(1, 1, 1).await.unwrap();
        let placed = world.engine.place_order(1).await.unwrap();

        assert!(matches!(
            world.engine.get_order(placed.id, 2).await,
            Err(CommerceError::Forbidden(_))
        ));
        assert!(matches!(
            world.engine.get_order(999, 1).await,
            Err(CommerceError::NotFound("order"))
        ));

        let view = world.engine.get_order(placed.id, 1).await.unwrap();
        assert_eq!(view.id, placed.id);
    }

    #[tokio::test]
    async fn test_read_auto_advances_and_persists() {
        let world = world().await;

        let mut order = Order::new(
            41,
            1,
            vec![OrderItem {
                id: 1,
                product_id: 1,
                product_name: "Mouse".to_string(),
                quantity: 1,
                unit_price: dec!(10.00).try_into().unwrap(),
            }],
            Utc::now() - Duration::seconds(SHIP_AFTER_SECS + 1),
        );
        world.orders.put(order.clone()).await.unwrap();

        let view = world.engine.get_order(41, 1).await.unwrap();
        assert_eq!(view.status, OrderStatus::Shipped);
        assert_eq!(
            view.estimated_delivery_date,
            Some(view.created_at + Duration::days(3))
        );

        // The advance was persisted, not just rendered.
        let stored = world.orders.get(41).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Shipped);

        // Past the delivery threshold it lands on the terminal state.
        order.created_at = Utc::now() - Duration::seconds(DELIVER_AFTER_SECS + 1);
        order.status = OrderStatus::Pending;
        world.orders.put(order).await.unwrap();
        let view = world.engine.get_order(41, 1).await.unwrap();
        assert_eq!(view.status, OrderStatus::Delivered);
    }

    #[tokio::test]
    async fn test_list_orders_most_recent_first() {
        let world = world().await;
        world.cart_service.add_item(1, 1, 1).await.unwrap();
        let first = world.engine.place_order(1).await.unwrap();
        world.cart_service.add_item(1, 2, 1).await.unwrap();
        let second = world.engine.place_order(1).await.unwrap();

        let views = world.engine.get_user_orders(1).await.unwrap();
        assert_eq!(views.len(), 2);
        assert_eq!(views[0].id, second.id);
        assert_eq!(views[1].id, first.id);
    }

    #[tokio::test]
    async fn test_corrupted_item_renders_placeholder() {
        let world = world().await;
        let order = Order::new(
            77,
            1,
            vec![
                OrderItem {
                    id: 1,
                    product_id: 1,
                    product_name: String::new(),
                    quantity: 2,
                    unit_price: dec!(10.00).try_into().unwrap(),
                },
                OrderItem {
                    id: 2,
                    product_id: 2,
                    product_name: "Keyboard".to_string(),
                    quantity: 1,
                    unit_price: dec!(5.00).try_into().unwrap(),
                },
            ],
            Utc::now(),
        );
        world.orders.put(order).await.unwrap();

        let view = world.engine.get_order(77, 1).await.unwrap();
        assert_eq!(view.items[0].product_name, CORRUPTED_ITEM_PLACEHOLDER);
        assert_eq!(view.items[0].subtotal, Money::ZERO);
        // The healthy line is unaffected.
        assert_eq!(view.items[1].subtotal, Money::new(dec!(5.00)));
    }
}
