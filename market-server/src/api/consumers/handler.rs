//! Consumer API Handlers

use axum::{Json, extract::State};
use shared::error::{AppError, AppResult};
use shared::models::{RatingDirection, TrustScore};

use crate::api::extract::AppPath;
use crate::auth::Principal;
use crate::core::ServerState;
use crate::security_log;

/// Vendors and the system see any buyer's score; a buyer sees only their own
pub async fn trust_score(
    State(state): State<ServerState>,
    principal: Principal,
    AppPath(id): AppPath<i64>,
) -> AppResult<Json<TrustScore>> {
    if principal.is_buyer() && principal.user_id != id {
        security_log!(
            WARN,
            "permission_denied",
            user_id = principal.user_id,
            consumer_id = id
        );
        return Err(AppError::permission_denied(
            "Buyers can only view their own trust score",
        ));
    }

    let score = state
        .ratings
        .aggregator()
        .score(RatingDirection::VendorToBuyer, id)
        .await?;
    Ok(Json(score))
}
