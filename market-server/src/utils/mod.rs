//! Logging setup and input validation helpers

pub mod logger;
pub mod validation;
