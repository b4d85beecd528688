//! Business API Module
//!
//! | Path | Method | Description |
//! |------|--------|-------------|
//! | /businesses/{id}/ratings | GET | ratings a vendor received, newest first |
//! | /businesses/{id}/trust-score | GET | aggregate of those ratings |

mod handler;

use axum::{Router, routing::get};

use crate::core::ServerState;

/// Business router
pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/businesses/{id}/ratings", get(handler::ratings))
        .route("/businesses/{id}/trust-score", get(handler::trust_score))
}
