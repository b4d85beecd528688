//! Shared types for the marketplace order and reputation services
//!
//! Domain models, request/response types and the unified error system,
//! used by the server and by API clients.

pub mod error;
pub mod models;
pub mod request;
pub mod response;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use error::{AppError, AppResult, ErrorCategory, ErrorCode, ErrorEnvelope};
