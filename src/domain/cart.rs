use super::{ItemId, ProductId, UserId};
use crate::domain::money::{Money, Price};
use serde::{Deserialize, Serialize};

/// A single line in a cart. The unit price is a snapshot taken when the line
/// was created, decoupled from later catalog price changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: ItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Price,
}

impl CartItem {
    pub fn subtotal(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

/// The mutable pre-order line-item list, one per user (created lazily).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub user_id: UserId,
    pub items: Vec<CartItem>,
    next_item_id: ItemId,
}

impl Cart {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            items: Vec::new(),
            next_item_id: 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn total(&self) -> Money {
        self.items.iter().map(CartItem::subtotal).sum()
    }

    pub fn item(&self, item_id: ItemId) -> Option<&CartItem> {
        self.items.iter().find(|item| item.id == item_id)
    }

    pub fn item_for_product(&self, product_id: ProductId) -> Option<&CartItem> {
        self.items.iter().find(|item| item.product_id == product_id)
    }

    /// Adds a line, merging into an existing line for the same product by
    /// summing quantities. Returns the id of the affected line and its
    /// resulting quantity; the caller validates that quantity against stock.
    pub fn upsert_line(
        &mut self,
        product_id: ProductId,
        product_name: &str,
        quantity: u32,
        unit_price: Price,
    ) -> (ItemId, u32) {
        if let Some(item) = self
            .items
            .iter_mut()
            .find(|item| item.product_id == product_id)
        {
            item.quantity = item.quantity.saturating_add(quantity);
            return (item.id, item.quantity);
        }

        let id = self.next_item_id;
        self.next_item_id += 1;
        self.items.push(CartItem {
            id,
            product_id,
            product_name: product_name.to_string(),
            quantity,
            unit_price,
        });
        (id, quantity)
    }

    pub fn set_quantity(&mut self, item_id: ItemId, quantity: u32) -> bool {
        match self.items.iter_mut().find(|item| item.id == item_id) {
            Some(item) => {
                item.quantity = quantity;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, item_id: ItemId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id != item_id);
        self.items.len() != before
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}
