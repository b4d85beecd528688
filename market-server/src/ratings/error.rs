//! Rating errors

use shared::error::{AppError, ErrorCode};
use shared::models::{OrderStatus, RatingDirection};
use thiserror::Error;

use crate::db::StoreError;

#[derive(Debug, Error)]
pub enum RatingError {
    #[error(transparent)]
    Validation(AppError),

    #[error("Order not found: {0}")]
    OrderNotFound(i64),

    #[error("Business not found: {0}")]
    BusinessNotFound(i64),

    #[error("Consumer not found: {0}")]
    ConsumerNotFound(i64),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Order {order_id} is {status}, not delivered")]
    NotDelivered { order_id: i64, status: OrderStatus },

    #[error("Caller cannot rate {direction}")]
    WrongRater { direction: RatingDirection },

    #[error("Order {order_id} already has a {direction} rating")]
    Duplicate {
        order_id: i64,
        direction: RatingDirection,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type RatingResult<T> = Result<T, RatingError>;

impl RatingError {
    /// Missing ratee for a direction
    pub fn ratee_not_found(direction: RatingDirection, ratee_id: i64) -> Self {
        match direction {
            RatingDirection::BuyerToVendor => Self::BusinessNotFound(ratee_id),
            RatingDirection::VendorToBuyer => Self::ConsumerNotFound(ratee_id),
        }
    }
}

impl From<RatingError> for AppError {
    fn from(err: RatingError) -> Self {
        match err {
            RatingError::Validation(e) => e,
            RatingError::OrderNotFound(id) => {
                AppError::with_message(ErrorCode::OrderNotFound, format!("Order not found: {id}"))
                    .with_detail("order_id", id)
            }
            RatingError::BusinessNotFound(id) => AppError::with_message(
                ErrorCode::BusinessNotFound,
                format!("Business not found: {id}"),
            )
            .with_detail("business_id", id),
            RatingError::ConsumerNotFound(id) => AppError::with_message(
                ErrorCode::ConsumerNotFound,
                format!("Consumer not found: {id}"),
            )
            .with_detail("consumer_id", id),
            RatingError::PermissionDenied(msg) => AppError::permission_denied(msg),
            RatingError::NotDelivered { order_id, status } => AppError::with_message(
                ErrorCode::OrderNotDelivered,
                format!("Order {order_id} is {status}; only delivered orders can be rated"),
            )
            .with_detail("order_id", order_id)
            .with_detail("status", status.as_str()),
            RatingError::WrongRater { direction } => AppError::with_message(
                ErrorCode::WrongRater,
                format!("Caller is not the rater for {direction}"),
            )
            .with_detail("direction", direction.as_str()),
            RatingError::Duplicate {
                order_id,
                direction,
            } => AppError::with_message(
                ErrorCode::DuplicateRating,
                format!("Order {order_id} already has a {direction} rating"),
            )
            .with_detail("order_id", order_id)
            .with_detail("direction", direction.as_str()),
            RatingError::Store(e) => e.into(),
        }
    }
}
