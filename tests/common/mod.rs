// Each suite pulls a different subset of this fixture.
#![allow(dead_code)]

use async_trait::async_trait;
use rust_decimal_macros::dec;
use shopcore::application::cart::CartService;
use shopcore::application::orders::OrderEngine;
use shopcore::application::payments::PaymentEngine;
use shopcore::domain::OrderId;
use shopcore::domain::money::Money;
use shopcore::domain::order::OrderStatus;
use shopcore::domain::ports::{InventoryStore, Notifier};
use shopcore::domain::product::{Product, UserProfile};
use shopcore::error::{CommerceError, Result};
use shopcore::infrastructure::in_memory::{
    InMemoryCartStore, InMemoryCatalog, InMemoryInventoryStore, InMemoryOrderStore,
    InMemoryPaymentStore, InMemoryUserDirectory,
};
use std::sync::{Arc, Mutex};

/// Notifier that records every delivery for assertions.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_order_confirmation(
        &self,
        to: &str,
        order_id: OrderId,
        amount: Money,
    ) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push(format!("confirmation:{to}:{order_id}:{amount}"));
        Ok(())
    }

    async fn send_status_update(
        &self,
        to: &str,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push(format!("status:{to}:{order_id}:{status}"));
        Ok(())
    }
}

/// Notifier whose deliveries always fail, for testing that engines swallow
/// notification errors.
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn send_order_confirmation(&self, _to: &str, _order_id: OrderId, _amount: Money) -> Result<()> {
        Err(CommerceError::Validation("smtp down".to_string()))
    }

    async fn send_status_update(
        &self,
        _to: &str,
        _order_id: OrderId,
        _status: OrderStatus,
    ) -> Result<()> {
        Err(CommerceError::Validation("smtp down".to_string()))
    }
}

pub struct TestWorld {
    pub carts: CartService,
    pub orders: OrderEngine,
    pub payments: PaymentEngine,
    pub inventory: Arc<InMemoryInventoryStore>,
    pub order_store: Arc<InMemoryOrderStore>,
    pub payment_store: Arc<InMemoryPaymentStore>,
    pub notifier: Arc<RecordingNotifier>,
}

/// A seeded world: two products (Mouse at 10.00, Keyboard at 5.00, ten of
/// each in stock) and users 1 and 2.
pub async fn world() -> TestWorld {
    world_with_notifier(Arc::new(RecordingNotifier::default())).await
}

pub async fn world_with_notifier(notifier: Arc<RecordingNotifier>) -> TestWorld {
    let (carts, orders, payments, inventory, order_store, payment_store) =
        build(notifier.clone()).await;
    TestWorld {
        carts,
        orders,
        payments,
        inventory,
        order_store,
        payment_store,
        notifier,
    }
}

/// Same world but with a notifier that always fails.
pub async fn world_with_failing_notifier() -> TestWorld {
    let (carts, orders, payments, inventory, order_store, payment_store) =
        build(Arc::new(FailingNotifier)).await;
    TestWorld {
        carts,
        orders,
        payments,
        inventory,
        order_store,
        payment_store,
        notifier: Arc::new(RecordingNotifier::default()),
    }
}

async fn build(
    notifier: Arc<dyn Notifier>,
) -> (
    CartService,
    OrderEngine,
    PaymentEngine,
    Arc<InMemoryInventoryStore>,
    Arc<InMemoryOrderStore>,
    Arc<InMemoryPaymentStore>,
) {
    let inventory = Arc::new(InMemoryInventoryStore::new());
    let cart_store = Arc::new(InMemoryCartStore::new());
    let order_store = Arc::new(InMemoryOrderStore::new());
    let payment_store = Arc::new(InMemoryPaymentStore::new());
    let catalog = InMemoryCatalog::new();
    let users = InMemoryUserDirectory::new();

    catalog
        .add_product(Product::new(1, "Mouse", dec!(10.00).try_into().unwrap()))
        .await;
    catalog
        .add_product(Product::new(2, "Keyboard", dec!(5.00).try_into().unwrap()))
        .await;
    for (id, username) in [(1, "ada"), (2, "grace")] {
        users
            .add_user(UserProfile {
                id,
                username: username.to_string(),
                email: format!("{username}@example.com"),
            })
            .await;
    }
    inventory.set_quantity(1, 10).await.unwrap();
    inventory.set_quantity(2, 10).await.unwrap();

    let catalog = Arc::new(catalog);
    let users = Arc::new(users);

    let carts = CartService::new(
        cart_store.clone(),
        inventory.clone(),
        catalog,
        users.clone(),
    );
    let orders = OrderEngine::new(
        order_store.clone(),
        cart_store,
        inventory.clone(),
        users.clone(),
        notifier.clone(),
    );
    let payments = PaymentEngine::new(payment_store.clone(), order_store.clone(), users, notifier);

    (carts, orders, payments, inventory, order_store, payment_store)
}
