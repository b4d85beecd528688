//! Order API Module
//!
//! | Path | Method | Description |
//! |------|--------|-------------|
//! | /orders | POST | checkout a cart into per-vendor orders |
//! | /orders | GET | orders visible to the caller |
//! | /orders/{id} | GET | one order with items and history |
//! | /orders/{id}/status | PATCH | apply a status transition |

mod handler;

use axum::{
    Router,
    routing::{get, patch},
};

use crate::core::ServerState;

/// Order router
pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/orders", get(handler::list).post(handler::create))
        .route("/orders/{id}", get(handler::get_by_id))
        .route("/orders/{id}/status", patch(handler::update_status))
}
