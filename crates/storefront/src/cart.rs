//! Cart line collection.
//!
//! At most one line per product id; repeated adds accumulate quantity on the
//! existing line and keep its position. Nothing here checks quantities
//! against `stock`.

use pva_market_core::{CartItem, Price, Product, ProductId};

use crate::error::ValidationError;

/// Ordered cart lines keyed by product id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Rebuild a cart from persisted lines, merging duplicate ids and
    /// dropping zero-quantity lines.
    #[must_use]
    pub fn from_items(items: Vec<CartItem>) -> Self {
        let mut cart = Self::new();
        for item in items {
            if item.quantity > 0 {
                cart.merge(item.product, item.quantity);
            }
        }
        cart
    }

    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// The line for `product_id`, if present.
    #[must_use]
    pub fn get(&self, product_id: &ProductId) -> Option<&CartItem> {
        self.items.iter().find(|item| item.product_id() == product_id)
    }

    /// Add `quantity` units of `product`.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::ZeroQuantity` for a zero quantity; the cart
    /// is unchanged.
    pub fn add(&mut self, product: Product, quantity: u32) -> Result<(), ValidationError> {
        if quantity == 0 {
            return Err(ValidationError::ZeroQuantity);
        }
        self.merge(product, quantity);
        Ok(())
    }

    fn merge(&mut self, product: Product, quantity: u32) {
        if let Some(existing) = self
            .items
            .iter_mut()
            .find(|item| item.product_id() == &product.id)
        {
            *existing = CartItem::new(product, existing.quantity.saturating_add(quantity));
        } else {
            self.items.push(CartItem::new(product, quantity));
        }
    }

    /// Remove the line for `product_id`. Returns whether a line was removed.
    pub fn remove(&mut self, product_id: &ProductId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.product_id() != product_id);
        self.items.len() != before
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Sum of `price * quantity` over every line, computed on each call.
    #[must_use]
    pub fn total(&self) -> Price {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Total units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .fold(0, |acc: u32, item| acc.saturating_add(item.quantity))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }
}
