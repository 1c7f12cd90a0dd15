use crate::domain::cart::Cart;
use crate::domain::order::Order;
use crate::domain::payment::Payment;
use crate::domain::ports::{
    Catalog, CartStore, InventoryStore, OrderStore, PaymentStore, UserDirectory,
};
use crate::domain::product::{Product, UserProfile};
use crate::domain::{OrderId, ProductId, UserId};
use crate::error::{CommerceError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

/// In-memory inventory ledger.
///
/// All reservations take the write lock, which serializes the
/// check-then-decrement step: two concurrent `reserve` calls for the same
/// product can never both succeed past the available quantity.
#[derive(Default, Clone)]
pub struct InMemoryInventoryStore {
    quantities: Arc<RwLock<HashMap<ProductId, u32>>>,
}

impl InMemoryInventoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InventoryStore for InMemoryInventoryStore {
    async fn available(&self, product_id: ProductId) -> Result<Option<u32>> {
        let quantities = self.quantities.read().await;
        Ok(quantities.get(&product_id).copied())
    }

    async fn reserve(&self, product_id: ProductId, quantity: u32) -> Result<()> {
        self.reserve_all(&[(product_id, quantity)]).await
    }

    async fn reserve_all(&self, lines: &[(ProductId, u32)]) -> Result<()> {
        let mut quantities = self.quantities.write().await;

        // Validate every line before touching any quantity, so a failure on
        // line N leaves lines 0..N undecremented.
        for &(product_id, quantity) in lines {
            let available = quantities.get(&product_id).copied().unwrap_or(0);
            let exists = quantities.contains_key(&product_id);
            if !exists || quantity > available {
                return Err(CommerceError::InsufficientStock {
                    product: product_id,
                    available: if exists { available } else { 0 },
                });
            }
        }

        for &(product_id, quantity) in lines {
            if let Some(available) = quantities.get_mut(&product_id) {
                *available -= quantity;
            }
        }
        Ok(())
    }

    async fn release(&self, product_id: ProductId, quantity: u32) -> Result<()> {
        let mut quantities = self.quantities.write().await;
        *quantities.entry(product_id).or_insert(0) += quantity;
        Ok(())
    }

    async fn release_all(&self, lines: &[(ProductId, u32)]) -> Result<()> {
        let mut quantities = self.quantities.write().await;
        for &(product_id, quantity) in lines {
            *quantities.entry(product_id).or_insert(0) += quantity;
        }
        Ok(())
    }

    async fn set_quantity(&self, product_id: ProductId, quantity: u32) -> Result<()> {
        let mut quantities = self.quantities.write().await;
        quantities.insert(product_id, quantity);
        Ok(())
    }
}

/// In-memory cart store, one cart per user.
///
/// The lock only protects the map itself. A `get`-mutate-`put` sequence is
/// not serialized per user, so concurrent mutations of the same cart are
/// last-writer-wins; the stock check at placement is the authoritative one.
#[derive(Default, Clone)]
pub struct InMemoryCartStore {
    carts: Arc<RwLock<HashMap<UserId, Cart>>>,
}

impl InMemoryCartStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CartStore for InMemoryCartStore {
    async fn get(&self, user_id: UserId) -> Result<Option<Cart>> {
        let carts = self.carts.read().await;
        Ok(carts.get(&user_id).cloned())
    }

    async fn put(&self, cart: Cart) -> Result<()> {
        let mut carts = self.carts.write().await;
        carts.insert(cart.user_id, cart);
        Ok(())
    }
}

/// In-memory order store with sequential id allocation.
#[derive(Default, Clone)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<HashMap<OrderId, Order>>>,
    next_id: Arc<AtomicU64>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self {
            orders: Arc::new(RwLock::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn next_id(&self) -> Result<OrderId> {
        Ok(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    async fn put(&self, order: Order) -> Result<()> {
        let mut orders = self.orders.write().await;
        orders.insert(order.id, order);
        Ok(())
    }

    async fn get(&self, order_id: OrderId) -> Result<Option<Order>> {
        let orders = self.orders.read().await;
        Ok(orders.get(&order_id).cloned())
    }

    async fn for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let orders = self.orders.read().await;
        let mut user_orders: Vec<Order> = orders
            .values()
            .filter(|order| order.user_id == user_id)
            .cloned()
            .collect();
        user_orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(user_orders)
    }

    async fn all(&self) -> Result<Vec<Order>> {
        let orders = self.orders.read().await;
        let mut all: Vec<Order> = orders.values().cloned().collect();
        all.sort_by_key(|order| order.id);
        Ok(all)
    }

    async fn delete(&self, order_id: OrderId) -> Result<()> {
        let mut orders = self.orders.write().await;
        orders.remove(&order_id);
        Ok(())
    }
}

/// In-memory payment store, keyed by order id (1:1).
#[derive(Default, Clone)]
pub struct InMemoryPaymentStore {
    payments: Arc<RwLock<HashMap<OrderId, Payment>>>,
}

impl InMemoryPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn put(&self, payment: Payment) -> Result<()> {
        let mut payments = self.payments.write().await;
        payments.insert(payment.order_id, payment);
        Ok(())
    }

    async fn get_by_order(&self, order_id: OrderId) -> Result<Option<Payment>> {
        let payments = self.payments.read().await;
        Ok(payments.get(&order_id).cloned())
    }
}

/// In-memory stand-in for the catalog collaborator.
#[derive(Default, Clone)]
pub struct InMemoryCatalog {
    products: Arc<RwLock<HashMap<ProductId, Product>>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_product(&self, product: Product) {
        let mut products = self.products.write().await;
        products.insert(product.id, product);
    }
}

#[async_trait]
impl Catalog for InMemoryCatalog {
    async fn get_product(&self, product_id: ProductId) -> Result<Option<Product>> {
        let products = self.products.read().await;
        Ok(products.get(&product_id).cloned())
    }
}

/// In-memory stand-in for the user directory collaborator.
#[derive(Default, Clone)]
pub struct InMemoryUserDirectory {
    users: Arc<RwLock<HashMap<UserId, UserProfile>>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_user(&self, user: UserProfile) {
        let mut users = self.users.write().await;
        users.insert(user.id, user);
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_user(&self, user_id: UserId) -> Result<Option<UserProfile>> {
        let users = self.users.read().await;
        Ok(users.get(&user_id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserProfile>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.username == username).cloned())
    }
}
