use crate::domain::cart::Cart;
use crate::domain::order::Order;
use crate::domain::payment::Payment;
use crate::domain::ports::{CartStore, InventoryStore, OrderStore, PaymentStore};
use crate::domain::{OrderId, ProductId, UserId};
use crate::error::{CommerceError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column family for inventory quantities.
pub const CF_INVENTORY: &str = "inventory";
/// Column family for carts, keyed by user id.
pub const CF_CARTS: &str = "carts";
/// Column family for orders.
pub const CF_ORDERS: &str = "orders";
/// Column family for payments, keyed by order id.
pub const CF_PAYMENTS: &str = "payments";
/// Column family for counters (order id allocation).
pub const CF_META: &str = "meta";

const NEXT_ORDER_ID_KEY: &[u8] = b"next_order_id";

/// A persistent store implementation using RocksDB.
///
/// One database backs all four store ports through separate column families.
/// `Clone` shares the underlying `Arc<DB>`. RocksDB has no multi-key
/// transactions in this setup, so the inventory check-then-decrement and the
/// id counter are serialized through an internal mutex shared by all clones.
#[derive(Clone)]
pub struct RocksDbStore {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
}

impl RocksDbStore {
    /// Opens or creates a RocksDB instance at the given path, ensuring the
    /// required column families exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = [CF_INVENTORY, CF_CARTS, CF_ORDERS, CF_PAYMENTS, CF_META]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, descriptors)
            .map_err(|e| CommerceError::Storage(e.to_string()))?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| CommerceError::Storage(format!("{name} column family not found")))
    }

    fn get_json<T: DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        let bytes = self
            .db
            .get_cf(cf, key)
            .map_err(|e| CommerceError::Storage(e.to_string()))?;
        match bytes {
            Some(bytes) => {
                let value = serde_json::from_slice(&bytes)
                    .map_err(|e| CommerceError::Storage(format!("deserialization error: {e}")))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn put_json<T: Serialize>(&self, cf_name: &str, key: &[u8], value: &T) -> Result<()> {
        let cf = self.cf(cf_name)?;
        let bytes = serde_json::to_vec(value)
            .map_err(|e| CommerceError::Storage(format!("serialization error: {e}")))?;
        self.db
            .put_cf(cf, key, bytes)
            .map_err(|e| CommerceError::Storage(e.to_string()))
    }

    fn read_quantity(&self, product_id: ProductId) -> Result<Option<u32>> {
        let cf = self.cf(CF_INVENTORY)?;
        let bytes = self
            .db
            .get_cf(cf, product_id.to_be_bytes())
            .map_err(|e| CommerceError::Storage(e.to_string()))?;
        match bytes {
            Some(bytes) => {
                let array: [u8; 4] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| CommerceError::Storage("corrupt inventory value".to_string()))?;
                Ok(Some(u32::from_be_bytes(array)))
            }
            None => Ok(None),
        }
    }

    fn scan_orders(&self) -> Result<Vec<Order>> {
        let cf = self.cf(CF_ORDERS)?;
        let mut orders = Vec::new();
        for item in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
            let (_key, value) = item.map_err(|e| CommerceError::Storage(e.to_string()))?;
            let order: Order = serde_json::from_slice(&value)
                .map_err(|e| CommerceError::Storage(format!("failed to deserialize order: {e}")))?;
            orders.push(order);
        }
        Ok(orders)
    }
}

#[async_trait]
impl InventoryStore for RocksDbStore {
    async fn available(&self, product_id: ProductId) -> Result<Option<u32>> {
        self.read_quantity(product_id)
    }

    async fn reserve(&self, product_id: ProductId, quantity: u32) -> Result<()> {
        self.reserve_all(&[(product_id, quantity)]).await
    }

    async fn reserve_all(&self, lines: &[(ProductId, u32)]) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut updated = Vec::with_capacity(lines.len());
        for &(product_id, quantity) in lines {
            match self.read_quantity(product_id)? {
                Some(available) if quantity <= available => {
                    updated.push((product_id, available - quantity));
                }
                Some(available) => {
                    return Err(CommerceError::InsufficientStock {
                        product: product_id,
                        available,
                    });
                }
                None => {
                    return Err(CommerceError::InsufficientStock {
                        product: product_id,
                        available: 0,
                    });
                }
            }
        }

        let cf = self.cf(CF_INVENTORY)?;
        let mut batch = WriteBatch::default();
        for (product_id, remaining) in updated {
            batch.put_cf(cf, product_id.to_be_bytes(), remaining.to_be_bytes());
        }
        self.db
            .write(batch)
            .map_err(|e| CommerceError::Storage(e.to_string()))
    }

    async fn release(&self, product_id: ProductId, quantity: u32) -> Result<()> {
        self.release_all(&[(product_id, quantity)]).await
    }

    async fn release_all(&self, lines: &[(ProductId, u32)]) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let cf = self.cf(CF_INVENTORY)?;
        let mut batch = WriteBatch::default();
        for &(product_id, quantity) in lines {
            let current = self.read_quantity(product_id)?.unwrap_or(0);
            batch.put_cf(cf, product_id.to_be_bytes(), (current + quantity).to_be_bytes());
        }
        self.db
            .write(batch)
            .map_err(|e| CommerceError::Storage(e.to_string()))
    }

    async fn set_quantity(&self, product_id: ProductId, quantity: u32) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let cf = self.cf(CF_INVENTORY)?;
        self.db
            .put_cf(cf, product_id.to_be_bytes(), quantity.to_be_bytes())
            .map_err(|e| CommerceError::Storage(e.to_string()))
    }
}

#[async_trait]
impl CartStore for RocksDbStore {
    async fn get(&self, user_id: UserId) -> Result<Option<Cart>> {
        self.get_json(CF_CARTS, &user_id.to_be_bytes())
    }

    async fn put(&self, cart: Cart) -> Result<()> {
        self.put_json(CF_CARTS, &cart.user_id.to_be_bytes(), &cart)
    }
}

#[async_trait]
impl OrderStore for RocksDbStore {
    async fn next_id(&self) -> Result<OrderId> {
        let _guard = self.write_lock.lock().await;
        let cf = self.cf(CF_META)?;
        let next = match self
            .db
            .get_cf(cf, NEXT_ORDER_ID_KEY)
            .map_err(|e| CommerceError::Storage(e.to_string()))?
        {
            Some(bytes) => {
                let array: [u8; 8] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| CommerceError::Storage("corrupt id counter".to_string()))?;
                u64::from_be_bytes(array)
            }
            None => 1,
        };
        self.db
            .put_cf(cf, NEXT_ORDER_ID_KEY, (next + 1).to_be_bytes())
            .map_err(|e| CommerceError::Storage(e.to_string()))?;
        Ok(next)
    }

    async fn put(&self, order: Order) -> Result<()> {
        self.put_json(CF_ORDERS, &order.id.to_be_bytes(), &order)
    }

    async fn get(&self, order_id: OrderId) -> Result<Option<Order>> {
        self.get_json(CF_ORDERS, &order_id.to_be_bytes())
    }

    async fn for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let mut orders = self.scan_orders()?;
        orders.retain(|order| order.user_id == user_id);
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(orders)
    }

    async fn all(&self) -> Result<Vec<Order>> {
        let mut orders = self.scan_orders()?;
        orders.sort_by_key(|order| order.id);
        Ok(orders)
    }

    async fn delete(&self, order_id: OrderId) -> Result<()> {
        let cf = self.cf(CF_ORDERS)?;
        self.db
            .delete_cf(cf, order_id.to_be_bytes())
            .map_err(|e| CommerceError::Storage(e.to_string()))
    }
}

#[async_trait]
impl PaymentStore for RocksDbStore {
    async fn put(&self, payment: Payment) -> Result<()> {
        self.put_json(CF_PAYMENTS, &payment.order_id.to_be_bytes(), &payment)
    }

    async fn get_by_order(&self, order_id: OrderId) -> Result<Option<Payment>> {
        self.get_json(CF_PAYMENTS, &order_id.to_be_bytes())
    }
}
