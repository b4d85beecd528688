//! Inventory ledger
//!
//! The only writer of `products.quantity`. A reservation is the decrement
//! itself: there is no hold/expiry window, and cancelling an order releases
//! its quantities back.
//!
//! Every reservation is one conditional update in the store
//! ([`StoreTx::try_decrement_stock`]), so concurrent reservations against the
//! same product can never drive stock below zero.

use shared::error::{AppError, ErrorCode};
use shared::models::OrderItem;
use std::sync::Arc;
use thiserror::Error;

use crate::db::{MarketStore, StoreError, StoreTx};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: i64,
        requested: i32,
        available: i32,
    },

    #[error("Product not found: {0}")]
    ProductNotFound(i64),

    #[error("Invalid quantity {quantity} for product {product_id}")]
    InvalidQuantity { product_id: i64, quantity: i32 },

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientStock {
                product_id,
                requested,
                available,
            } => AppError::with_message(
                ErrorCode::InsufficientStock,
                format!("Insufficient stock for product {product_id}"),
            )
            .with_detail("product_id", product_id)
            .with_detail("requested", requested)
            .with_detail("available", available),
            LedgerError::ProductNotFound(id) => AppError::with_message(
                ErrorCode::ProductNotFound,
                format!("Product not found: {id}"),
            )
            .with_detail("product_id", id),
            LedgerError::InvalidQuantity {
                product_id,
                quantity,
            } => AppError::with_message(
                ErrorCode::InvalidQuantity,
                format!("Quantity must be at least 1, got {quantity}"),
            )
            .with_detail("product_id", product_id)
            .with_detail("quantity", quantity),
            LedgerError::Store(e) => e.into(),
        }
    }
}

/// `(product_id, quantity)` of `items` in ascending product id order.
///
/// Every multi-line stock write goes through this order, so two units of
/// work touching the same products always lock their rows in the same
/// sequence and cannot deadlock each other.
pub fn in_lock_order(items: &[OrderItem]) -> Vec<(i64, i32)> {
    let mut lines: Vec<(i64, i32)> = items.iter().map(|i| (i.product_id, i.quantity)).collect();
    lines.sort_unstable_by_key(|&(product_id, _)| product_id);
    lines
}

/// Per-product available quantity
#[derive(Clone)]
pub struct InventoryLedger {
    store: Arc<dyn MarketStore>,
}

impl InventoryLedger {
    pub fn new(store: Arc<dyn MarketStore>) -> Self {
        Self { store }
    }

    /// Reserve in a unit of work of its own
    pub async fn reserve(&self, product_id: i64, qty: i32) -> LedgerResult<()> {
        let mut tx = self.store.begin().await?;
        self.reserve_in(tx.as_mut(), product_id, qty).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Release in a unit of work of its own
    pub async fn release(&self, product_id: i64, qty: i32) -> LedgerResult<()> {
        let mut tx = self.store.begin().await?;
        self.release_in(tx.as_mut(), product_id, qty).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Decrement `qty` units inside the caller's unit of work.
    ///
    /// Fails with [`LedgerError::InsufficientStock`] when fewer than `qty`
    /// units are available at the moment of the update.
    pub async fn reserve_in(
        &self,
        tx: &mut dyn StoreTx,
        product_id: i64,
        qty: i32,
    ) -> LedgerResult<()> {
        if qty < 1 {
            return Err(LedgerError::InvalidQuantity {
                product_id,
                quantity: qty,
            });
        }

        if tx.try_decrement_stock(product_id, qty).await? {
            tracing::debug!(product_id, qty, "Stock reserved");
            return Ok(());
        }

        // No row changed: either the product is gone or stock ran short
        let available = tx
            .get_products(&[product_id])
            .await?
            .into_iter()
            .next()
            .map(|p| p.quantity)
            .ok_or(LedgerError::ProductNotFound(product_id))?;

        tracing::info!(product_id, requested = qty, available, "Insufficient stock");
        Err(LedgerError::InsufficientStock {
            product_id,
            requested: qty,
            available,
        })
    }

    /// Re-increment `qty` units inside the caller's unit of work
    pub async fn release_in(
        &self,
        tx: &mut dyn StoreTx,
        product_id: i64,
        qty: i32,
    ) -> LedgerResult<()> {
        if qty < 1 {
            return Err(LedgerError::InvalidQuantity {
                product_id,
                quantity: qty,
            });
        }
        if !tx.increment_stock(product_id, qty).await? {
            return Err(LedgerError::ProductNotFound(product_id));
        }
        tracing::debug!(product_id, qty, "Stock released");
        Ok(())
    }

    /// Reserve every line of a new order, stopping at the first shortfall
    pub async fn reserve_items_in(
        &self,
        tx: &mut dyn StoreTx,
        items: &[OrderItem],
    ) -> LedgerResult<()> {
        for (product_id, qty) in in_lock_order(items) {
            self.reserve_in(tx, product_id, qty).await?;
        }
        Ok(())
    }

    /// Release every line of an order (cancellation)
    pub async fn release_items_in(
        &self,
        tx: &mut dyn StoreTx,
        items: &[OrderItem],
    ) -> LedgerResult<()> {
        for (product_id, qty) in in_lock_order(items) {
            self.release_in(tx, product_id, qty).await?;
        }
        Ok(())
    }

    /// Current available quantity
    pub async fn available(&self, product_id: i64) -> LedgerResult<i32> {
        let mut tx = self.store.begin().await?;
        let product = tx
            .get_products(&[product_id])
            .await?
            .into_iter()
            .next()
            .ok_or(LedgerError::ProductNotFound(product_id))?;
        Ok(product.quantity)
    }
}
