use super::{ProductId, UserId};
use crate::domain::money::Price;
use serde::{Deserialize, Serialize};

/// Read-only product snapshot served by the catalog collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    pub active: bool,
}

impl Product {
    pub fn new(id: ProductId, name: impl Into<String>, price: Price) -> Self {
        Self {
            id,
            name: name.into(),
            price,
            active: true,
        }
    }
}

/// Acting principal resolved through the user directory collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    pub email: String,
}
