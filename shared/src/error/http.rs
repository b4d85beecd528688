//! HTTP status code mapping for error codes

use super::category::ErrorCategory;
use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCategory {
    /// Get the HTTP status code shared by every code in this category
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::Validation => StatusCode::BAD_REQUEST,
            Self::Authentication => StatusCode::UNAUTHORIZED,
            Self::Authorization => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::Integration => StatusCode::BAD_GATEWAY,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            // Transient, the collaborator may come back
            Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            _ => self.category().http_status(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_status() {
        assert_eq!(ErrorCode::EmptyCart.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ErrorCode::InvalidRating.http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ErrorCode::OrderNotDelivered.http_status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_conflict_status() {
        assert_eq!(
            ErrorCode::InsufficientStock.http_status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ErrorCode::OrderAlreadyFinalized.http_status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ErrorCode::DuplicateRating.http_status(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_auth_status() {
        assert_eq!(
            ErrorCode::NotAuthenticated.http_status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ErrorCode::PermissionDenied.http_status(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn test_not_found_status() {
        assert_eq!(ErrorCode::OrderNotFound.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ErrorCode::ConsumerNotFound.http_status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_integration_and_internal_status() {
        assert_eq!(
            ErrorCode::IntegrationFailed.http_status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ErrorCode::ServiceUnavailable.http_status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ErrorCode::DatabaseError.http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
