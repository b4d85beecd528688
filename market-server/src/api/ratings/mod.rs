//! Rating API Module
//!
//! | Path | Method | Description |
//! |------|--------|-------------|
//! | /ratings | POST | rate the other party of a delivered order |

mod handler;

use axum::{Router, routing::post};

use crate::core::ServerState;

/// Rating router
pub fn router() -> Router<ServerState> {
    Router::new().route("/ratings", post(handler::create))
}
