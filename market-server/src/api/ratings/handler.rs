//! Rating API Handlers

use axum::{Json, extract::State, http::StatusCode};
use shared::error::AppResult;
use shared::models::Rating;
use shared::request::CreateRatingRequest;

use crate::api::extract::AppJson;
use crate::auth::Principal;
use crate::core::ServerState;

/// Submit a rating; the aggregate of the ratee is updated in the same unit of work
pub async fn create(
    State(state): State<ServerState>,
    principal: Principal,
    AppJson(req): AppJson<CreateRatingRequest>,
) -> AppResult<(StatusCode, Json<Rating>)> {
    let rating = state.ratings.create_rating(&principal, &req).await?;
    Ok((StatusCode::CREATED, Json(rating)))
}
