//! Consumer API Module
//!
//! | Path | Method | Description |
//! |------|--------|-------------|
//! | /consumers/{id}/trust-score | GET | buyer trust score from vendor ratings |

mod handler;

use axum::{Router, routing::get};

use crate::core::ServerState;

/// Consumer router
pub fn router() -> Router<ServerState> {
    Router::new().route("/consumers/{id}/trust-score", get(handler::trust_score))
}
