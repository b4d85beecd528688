//! Order lifecycle
//!
//! - [`OrderOrchestrator`] - splits a cart into per-vendor orders
//! - [`OrderStateMachine`] - validates and applies status transitions
//! - [`OrderReader`] - caller-scoped reads

pub mod error;
pub mod orchestrator;
pub mod reader;
pub mod state_machine;

pub use error::{OrderError, OrderResult};
pub use orchestrator::{OrderOrchestrator, VendorGroup};
pub use reader::OrderReader;
pub use state_machine::OrderStateMachine;
