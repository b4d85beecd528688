//! Unified error system for the marketplace
//!
//! - [`ErrorCode`]: closed set of error codes
//! - [`ErrorCategory`]: classification that drives the HTTP status
//! - [`AppError`]: code + message + optional details
//! - [`ErrorEnvelope`]: wire format `{ "error": { code, message, details?, timestamp } }`
//!
//! # Example
//!
//! ```
//! use shared::error::{AppError, ErrorCode};
//!
//! let err = AppError::new(ErrorCode::InsufficientStock)
//!     .with_detail("product_id", 42)
//!     .with_detail("requested", 2)
//!     .with_detail("available", 1);
//!
//! assert_eq!(err.http_status(), http::StatusCode::CONFLICT);
//! ```

mod category;
mod codes;
mod http;
mod types;

pub use category::ErrorCategory;
pub use codes::{ErrorCode, InvalidErrorCode};
pub use types::{AppError, AppResult, ErrorBody, ErrorEnvelope};
