//! Shopping cart model.

use serde::Serialize;

use marketplace_core::{CartId, UserId};

use super::product::Product;

/// A user's cart with each line resolved to its current catalog record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub id: CartId,
    pub user_id: UserId,
    pub items: Vec<CartLine>,
}

/// One cart line: a product and the requested quantity.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product: Product,
    pub quantity: i32,
}

impl Cart {
    /// Whether the cart holds no lines.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
