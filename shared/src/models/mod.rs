//! Data models
//!
//! Shared between market-server and API clients.
//! All IDs are `i64` snowflakes, timestamps are Unix millis, money is `Decimal`.

pub mod order;
pub mod product;
pub mod rating;

// Re-exports
pub use order::*;
pub use product::*;
pub use rating::*;
