//! Authentication boundary
//!
//! - [`JwtService`] - bearer token verification
//! - [`Principal`] - authenticated caller, extracted per request

pub mod extractor;
pub mod jwt;

pub use jwt::{Claims, JwtConfig, JwtError, JwtService, Principal, Role};
