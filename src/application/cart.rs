use crate::domain::cart::Cart;
use crate::domain::ports::{CartStoreRef, CatalogRef, InventoryStoreRef, UserDirectoryRef};
use crate::domain::{ItemId, ProductId, UserId};
use crate::error::{CommerceError, Result};

/// Cart operations: lazy get-or-create plus line mutations, each revalidated
/// against the inventory ledger's current availability.
pub struct CartService {
    carts: CartStoreRef,
    inventory: InventoryStoreRef,
    catalog: CatalogRef,
    users: UserDirectoryRef,
}

impl CartService {
    pub fn new(
        carts: CartStoreRef,
        inventory: InventoryStoreRef,
        catalog: CatalogRef,
        users: UserDirectoryRef,
    ) -> Self {
        Self {
            carts,
            inventory,
            catalog,
            users,
        }
    }

    /// The user's cart, created empty on first access.
    pub async fn get_or_create(&self, user_id: UserId) -> Result<Cart> {
        if self.users.find_user(user_id).await?.is_none() {
            return Err(CommerceError::NotFound("user"));
        }
        if let Some(cart) = self.carts.get(user_id).await? {
            return Ok(cart);
        }
        let cart = Cart::new(user_id);
        self.carts.put(cart.clone()).await?;
        Ok(cart)
    }

    /// Adds `quantity` of a product, merging with an existing line for the
    /// same product. The merged quantity as a whole is checked against the
    /// ledger's current availability, not a cached value.
    pub async fn add_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Cart> {
        if quantity == 0 {
            return Err(CommerceError::Validation(
                "quantity must be at least 1".to_string(),
            ));
        }

        let product = self
            .catalog
            .get_product(product_id)
            .await?
            .ok_or(CommerceError::NotFound("product"))?;
        if !product.active {
            return Err(CommerceError::InvalidState(
                "product is not available".to_string(),
            ));
        }

        let available = self.stock_for(product_id).await?;
        let mut cart = self.get_or_create(user_id).await?;

        let merged = match cart.item_for_product(product_id) {
            Some(item) => item.quantity.checked_add(quantity).ok_or_else(|| {
                CommerceError::Validation("merged quantity overflows".to_string())
            })?,
            None => quantity,
        };
        if merged > available {
            return Err(CommerceError::InsufficientStock {
                product: product_id,
                available,
            });
        }

        cart.upsert_line(product_id, &product.name, quantity, product.price);
        self.carts.put(cart.clone()).await?;
        Ok(cart)
    }

    /// Replaces a line's quantity after revalidating against current stock.
    pub async fn update_item(&self, user_id: UserId, item_id: ItemId, quantity: u32) -> Result<Cart> {
        if quantity == 0 {
            return Err(CommerceError::Validation(
                "quantity must be at least 1".to_string(),
            ));
        }

        let mut cart = self
            .carts
            .get(user_id)
            .await?
            .ok_or(CommerceError::NotFound("cart"))?;
        let item = cart
            .item(item_id)
            .ok_or_else(|| forbidden_item(item_id))?
            .clone();

        let available = self.stock_for(item.product_id).await?;
        if quantity > available {
            return Err(CommerceError::InsufficientStock {
                product: item.product_id,
                available,
            });
        }

        cart.set_quantity(item_id, quantity);
        self.carts.put(cart.clone()).await?;
        Ok(cart)
    }

    pub async fn remove_item(&self, user_id: UserId, item_id: ItemId) -> Result<Cart> {
        let mut cart = self
            .carts
            .get(user_id)
            .await?
            .ok_or(CommerceError::NotFound("cart"))?;
        if !cart.remove(item_id) {
            return Err(forbidden_item(item_id));
        }
        self.carts.put(cart.clone()).await?;
        Ok(cart)
    }

    pub async fn clear(&self, user_id: UserId) -> Result<()> {
        let mut cart = self
            .carts
            .get(user_id)
            .await?
            .ok_or(CommerceError::NotFound("cart"))?;
        cart.clear();
        self.carts.put(cart).await?;
        Ok(())
    }

    /// Available stock, with a missing ledger record meaning out of stock.
    async fn stock_for(&self, product_id: ProductId) -> Result<u32> {
        match self.inventory.available(product_id).await? {
            Some(quantity) => Ok(quantity),
            None => Err(CommerceError::InsufficientStock {
                product: product_id,
                available: 0,
            }),
        }
    }
}

fn forbidden_item(item_id: ItemId) -> CommerceError {
    CommerceError::Forbidden(format!("cart item {item_id} does not belong to user's cart"))
}
