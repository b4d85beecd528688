//! Marketplace order lifecycle and reputation server
//!
//! # Modules
//!
//! - [`inventory`] - stock reservation and release
//! - [`orders`] - checkout, status transitions, order reads
//! - [`ratings`] - ratings and trust score aggregation
//! - [`db`] - storage traits with PostgreSQL and in-memory backends
//! - [`auth`] - JWT bearer authentication
//! - [`api`] - HTTP routes
//! - [`core`] - configuration, state, server bootstrap

pub mod api;
pub mod auth;
pub mod core;
pub mod db;
pub mod inventory;
pub mod notify;
pub mod orders;
pub mod ratings;
pub mod utils;

pub use crate::core::{Config, Server, ServerState};
