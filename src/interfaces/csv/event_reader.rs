use crate::domain::{OrderId, ProductId, UserId};
use crate::error::CommerceError;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    /// Seed a catalog product (product, amount = price, name).
    Product,
    /// Seed a user profile (user, name, email).
    User,
    /// Absolute inventory set (product, qty).
    Stock,
    /// Add to a user's cart (user, product, qty).
    Add,
    /// Place the user's cart as an order (user).
    Place,
    /// Initiate a payment (order, name = provider override).
    Init,
    /// Confirm a payment (order, name = provider payment reference).
    Pay,
    /// Fail a pending payment (order).
    Fail,
}

/// One row of the commerce events CSV driving the engines from the CLI.
/// Columns are positional by header; fields that an event does not use stay
/// empty.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct Event {
    pub r#type: EventType,
    pub user: Option<UserId>,
    pub product: Option<ProductId>,
    pub qty: Option<u32>,
    pub order: Option<OrderId>,
    pub amount: Option<Decimal>,
    pub name: Option<String>,
    pub email: Option<String>,
}

pub struct EventReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> EventReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    pub fn events(self) -> impl Iterator<Item = Result<Event, CommerceError>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(CommerceError::from))
    }
}

pub const EVENT_HEADERS: [&str; 8] = [
    "type", "user", "product", "qty", "order", "amount", "name", "email",
];
