//! Unified error codes for the marketplace
//!
//! Every code belongs to exactly one [`ErrorCategory`](super::ErrorCategory),
//! and the category decides the HTTP status. Codes travel over the wire as
//! their variant name (`"InsufficientStock"`), so clients can match on them
//! without a lookup table.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unified error code enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    // ==================== Validation ====================
    /// Request failed validation
    ValidationFailed,
    /// Request could not be interpreted
    InvalidRequest,
    /// Checkout submitted without any cart lines
    EmptyCart,
    /// Cart line quantity outside the accepted range
    InvalidQuantity,
    /// Stars or criteria outside 1..=5
    InvalidRating,
    /// Rating submitted for an order that has not been delivered
    OrderNotDelivered,
    /// Rater is a party to the order but not the one the direction requires
    WrongRater,

    // ==================== Authentication ====================
    /// No bearer token supplied
    NotAuthenticated,
    /// Bearer token malformed, expired or signed with another key
    TokenInvalid,

    // ==================== Authorization ====================
    /// Actor is not allowed to perform the operation
    PermissionDenied,

    // ==================== Not found ====================
    /// Generic missing resource
    NotFound,
    /// Order not found
    OrderNotFound,
    /// Product not found
    ProductNotFound,
    /// Business (vendor) not found
    BusinessNotFound,
    /// Consumer (buyer) not found
    ConsumerNotFound,

    // ==================== Conflict ====================
    /// Requested quantity exceeds available stock
    InsufficientStock,
    /// Status transition not in the transition table
    InvalidTransition,
    /// Order already reached a terminal status
    OrderAlreadyFinalized,
    /// A rating already exists for this order and direction
    DuplicateRating,

    // ==================== Integration ====================
    /// External collaborator returned an error
    IntegrationFailed,
    /// External collaborator unreachable
    ServiceUnavailable,

    // ==================== Internal ====================
    /// Unexpected internal error
    InternalError,
    /// Storage layer failure
    DatabaseError,
}

impl ErrorCode {
    /// All codes, in declaration order
    pub const ALL: [ErrorCode; 23] = [
        Self::ValidationFailed,
        Self::InvalidRequest,
        Self::EmptyCart,
        Self::InvalidQuantity,
        Self::InvalidRating,
        Self::OrderNotDelivered,
        Self::WrongRater,
        Self::NotAuthenticated,
        Self::TokenInvalid,
        Self::PermissionDenied,
        Self::NotFound,
        Self::OrderNotFound,
        Self::ProductNotFound,
        Self::BusinessNotFound,
        Self::ConsumerNotFound,
        Self::InsufficientStock,
        Self::InvalidTransition,
        Self::OrderAlreadyFinalized,
        Self::DuplicateRating,
        Self::IntegrationFailed,
        Self::ServiceUnavailable,
        Self::InternalError,
        Self::DatabaseError,
    ];

    /// Wire name of the code
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ValidationFailed => "ValidationFailed",
            Self::InvalidRequest => "InvalidRequest",
            Self::EmptyCart => "EmptyCart",
            Self::InvalidQuantity => "InvalidQuantity",
            Self::InvalidRating => "InvalidRating",
            Self::OrderNotDelivered => "OrderNotDelivered",
            Self::WrongRater => "WrongRater",
            Self::NotAuthenticated => "NotAuthenticated",
            Self::TokenInvalid => "TokenInvalid",
            Self::PermissionDenied => "PermissionDenied",
            Self::NotFound => "NotFound",
            Self::OrderNotFound => "OrderNotFound",
            Self::ProductNotFound => "ProductNotFound",
            Self::BusinessNotFound => "BusinessNotFound",
            Self::ConsumerNotFound => "ConsumerNotFound",
            Self::InsufficientStock => "InsufficientStock",
            Self::InvalidTransition => "InvalidTransition",
            Self::OrderAlreadyFinalized => "OrderAlreadyFinalized",
            Self::DuplicateRating => "DuplicateRating",
            Self::IntegrationFailed => "IntegrationFailed",
            Self::ServiceUnavailable => "ServiceUnavailable",
            Self::InternalError => "InternalError",
            Self::DatabaseError => "DatabaseError",
        }
    }

    /// Default human-readable message
    pub const fn message(&self) -> &'static str {
        match self {
            Self::ValidationFailed => "Validation failed",
            Self::InvalidRequest => "Invalid request",
            Self::EmptyCart => "Cart is empty",
            Self::InvalidQuantity => "Invalid quantity",
            Self::InvalidRating => "Rating values must be between 1 and 5",
            Self::OrderNotDelivered => "Order has not been delivered",
            Self::WrongRater => "Rater does not match the rating direction",
            Self::NotAuthenticated => "Authentication required",
            Self::TokenInvalid => "Invalid token",
            Self::PermissionDenied => "Permission denied",
            Self::NotFound => "Resource not found",
            Self::OrderNotFound => "Order not found",
            Self::ProductNotFound => "Product not found",
            Self::BusinessNotFound => "Business not found",
            Self::ConsumerNotFound => "Consumer not found",
            Self::InsufficientStock => "Insufficient stock",
            Self::InvalidTransition => "Invalid status transition",
            Self::OrderAlreadyFinalized => "Order is already finalized",
            Self::DuplicateRating => "Rating already submitted for this order",
            Self::IntegrationFailed => "External service failed",
            Self::ServiceUnavailable => "External service unavailable",
            Self::InternalError => "Internal server error",
            Self::DatabaseError => "Database error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown error code name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidErrorCode(pub String);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl FromStr for ErrorCode {
    type Err = InvalidErrorCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|code| code.as_str() == s)
            .ok_or_else(|| InvalidErrorCode(s.to_string()))
    }
}
