//! Error category classification

use super::codes::ErrorCode;
use serde::{Deserialize, Serialize};

/// Error category, the unit the HTTP mapping and retry advice are keyed on
///
/// - Validation: malformed input, client should correct and resubmit
/// - Authentication: missing or bad credentials
/// - Authorization: actor not allowed for this order/direction
/// - NotFound: unknown id
/// - Conflict: well-formed but cannot be honored in the current state, never retry as-is
/// - Integration: external collaborator failure
/// - Internal: storage or unexpected failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Validation,
    Authentication,
    Authorization,
    NotFound,
    Conflict,
    Integration,
    Internal,
}

impl ErrorCategory {
    /// Get the string name for this category
    pub fn name(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Authentication => "authentication",
            Self::Authorization => "authorization",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::Integration => "integration",
            Self::Internal => "internal",
        }
    }
}

impl ErrorCode {
    /// Get the category for this error code
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ValidationFailed
            | Self::InvalidRequest
            | Self::EmptyCart
            | Self::InvalidQuantity
            | Self::InvalidRating
            | Self::OrderNotDelivered
            | Self::WrongRater => ErrorCategory::Validation,

            Self::NotAuthenticated | Self::TokenInvalid => ErrorCategory::Authentication,

            Self::PermissionDenied => ErrorCategory::Authorization,

            Self::NotFound
            | Self::OrderNotFound
            | Self::ProductNotFound
            | Self::BusinessNotFound
            | Self::ConsumerNotFound => ErrorCategory::NotFound,

            Self::InsufficientStock
            | Self::InvalidTransition
            | Self::OrderAlreadyFinalized
            | Self::DuplicateRating => ErrorCategory::Conflict,

            Self::IntegrationFailed | Self::ServiceUnavailable => ErrorCategory::Integration,

            Self::InternalError | Self::DatabaseError => ErrorCategory::Internal,
        }
    }
}
