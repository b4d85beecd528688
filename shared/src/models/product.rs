//! Product Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Catalog product owned by exactly one vendor
///
/// `quantity` is the available stock. Only the inventory ledger writes it
/// after creation, and it never goes negative.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: i64,
    /// Owning business
    pub vendor_id: i64,
    pub name: String,
    /// Unit price in currency unit (>= 0)
    pub price: Decimal,
    /// Available stock (>= 0)
    pub quantity: i32,
}

impl Product {
    pub fn in_stock(&self) -> bool {
        self.quantity > 0
    }
}
