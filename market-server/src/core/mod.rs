//! Core: configuration, shared state, server bootstrap

pub mod config;
pub mod server;
pub mod state;

pub use config::{Config, StoreBackend};
pub use server::Server;
pub use state::ServerState;
