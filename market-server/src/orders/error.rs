//! Order errors

use shared::error::{AppError, ErrorCode};
use shared::models::OrderStatus;
use thiserror::Error;

use crate::db::StoreError;
use crate::inventory::LedgerError;

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Cart is empty")]
    EmptyCart,

    #[error("Cart has {count} distinct products, max {max}")]
    TooManyLines { count: usize, max: usize },

    #[error("Invalid quantity {quantity} for product {product_id}")]
    InvalidQuantity { product_id: i64, quantity: i32 },

    #[error("Products not found: {0:?}")]
    ProductsNotFound(Vec<i64>),

    #[error("Consumer not found: {0}")]
    ConsumerNotFound(i64),

    #[error("Order not found: {0}")]
    OrderNotFound(i64),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Order {order_id} already finalized as {status}")]
    AlreadyFinalized { order_id: i64, status: OrderStatus },

    #[error("Invalid transition {from} -> {to}")]
    InvalidTransition {
        from: OrderStatus,
        to: OrderStatus,
        reason: Option<&'static str>,
    },

    #[error(transparent)]
    Validation(AppError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type OrderResult<T> = Result<T, OrderError>;

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::EmptyCart => AppError::new(ErrorCode::EmptyCart),
            OrderError::TooManyLines { count, max } => AppError::validation(format!(
                "Cart has {count} distinct products, max {max}"
            ))
            .with_detail("lines", count)
            .with_detail("max_lines", max),
            OrderError::InvalidQuantity {
                product_id,
                quantity,
            } => AppError::with_message(
                ErrorCode::InvalidQuantity,
                format!("Invalid quantity {quantity} for product {product_id}"),
            )
            .with_detail("product_id", product_id)
            .with_detail("quantity", quantity),
            OrderError::ProductsNotFound(ids) => AppError::with_message(
                ErrorCode::ProductNotFound,
                format!("Products not found: {ids:?}"),
            )
            .with_detail("product_ids", ids),
            OrderError::ConsumerNotFound(id) => {
                AppError::with_message(ErrorCode::ConsumerNotFound, format!("Consumer not found: {id}"))
                    .with_detail("consumer_id", id)
            }
            OrderError::OrderNotFound(id) => {
                AppError::with_message(ErrorCode::OrderNotFound, format!("Order not found: {id}"))
                    .with_detail("order_id", id)
            }
            OrderError::PermissionDenied(msg) => AppError::permission_denied(msg),
            OrderError::AlreadyFinalized { order_id, status } => AppError::with_message(
                ErrorCode::OrderAlreadyFinalized,
                format!("Order {order_id} is already {status}"),
            )
            .with_detail("order_id", order_id)
            .with_detail("status", status.as_str()),
            OrderError::InvalidTransition { from, to, reason } => {
                let message = match reason {
                    Some(reason) => format!("Cannot move order from {from} to {to}: {reason}"),
                    None => format!("Cannot move order from {from} to {to}"),
                };
                AppError::with_message(ErrorCode::InvalidTransition, message)
                    .with_detail("from", from.as_str())
                    .with_detail("to", to.as_str())
            }
            OrderError::Validation(e) => e,
            OrderError::Ledger(e) => e.into(),
            OrderError::Store(e) => e.into(),
        }
    }
}
