//! Business API Handlers
//!
//! Vendor reputation is public to any authenticated caller.

use axum::{Json, extract::State};
use shared::error::AppResult;
use shared::models::{Rating, RatingDirection, TrustScore};

use crate::api::extract::AppPath;
use crate::auth::Principal;
use crate::core::ServerState;

pub async fn ratings(
    State(state): State<ServerState>,
    _principal: Principal,
    AppPath(id): AppPath<i64>,
) -> AppResult<Json<Vec<Rating>>> {
    let ratings = state.ratings.ratings_for_business(id).await?;
    Ok(Json(ratings))
}

pub async fn trust_score(
    State(state): State<ServerState>,
    _principal: Principal,
    AppPath(id): AppPath<i64>,
) -> AppResult<Json<TrustScore>> {
    let score = state
        .ratings
        .aggregator()
        .score(RatingDirection::BuyerToVendor, id)
        .await?;
    Ok(Json(score))
}
