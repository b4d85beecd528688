//! Order API Handlers

use axum::{Json, extract::State, http::StatusCode};
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{Order, OrderDetail};
use shared::request::{CreateOrdersRequest, OrderListQuery, UpdateStatusRequest};
use shared::response::{CheckoutResponse, VendorFailure};

use crate::api::extract::{AppJson, AppPath, AppQuery};
use crate::auth::Principal;
use crate::core::ServerState;
use crate::security_log;

/// Checkout. 201 when at least one vendor order was created.
pub async fn create(
    State(state): State<ServerState>,
    principal: Principal,
    AppJson(req): AppJson<CreateOrdersRequest>,
) -> AppResult<(StatusCode, Json<CheckoutResponse>)> {
    if !principal.is_buyer() {
        security_log!(WARN, "permission_denied", user_id = principal.user_id, action = "checkout");
        return Err(AppError::permission_denied("Only buyers can place orders"));
    }

    let response = state.orchestrator.checkout(principal.user_id, &req).await?;
    if response.orders.is_empty() {
        return Err(all_groups_failed(response.failures));
    }

    Ok((StatusCode::CREATED, Json(response)))
}

/// Every vendor group failed: answer with the first failure, listing all of them
fn all_groups_failed(failures: Vec<VendorFailure>) -> AppError {
    let Some(first) = failures.first() else {
        return AppError::internal("Checkout produced neither orders nor failures");
    };

    let mut err = AppError::with_message(first.code, first.message.clone());
    err.details = first.details.clone();
    if first.code == ErrorCode::InternalError || first.code == ErrorCode::DatabaseError {
        return err;
    }

    let listed = serde_json::to_value(&failures).unwrap_or_default();
    err.with_detail("failures", listed)
}

/// Orders visible to the caller, newest first
pub async fn list(
    State(state): State<ServerState>,
    principal: Principal,
    AppQuery(query): AppQuery<OrderListQuery>,
) -> AppResult<Json<Vec<Order>>> {
    let orders = state.orders.list(&principal, &query).await?;
    Ok(Json(orders))
}

/// Order with items and status history
pub async fn get_by_id(
    State(state): State<ServerState>,
    principal: Principal,
    AppPath(id): AppPath<i64>,
) -> AppResult<Json<OrderDetail>> {
    let detail = state.orders.get(id, &principal).await?;
    Ok(Json(detail))
}

/// Apply a status transition
pub async fn update_status(
    State(state): State<ServerState>,
    principal: Principal,
    AppPath(id): AppPath<i64>,
    AppJson(req): AppJson<UpdateStatusRequest>,
) -> AppResult<Json<OrderDetail>> {
    let detail = state
        .state_machine
        .apply(id, &principal, req.status, req.reason)
        .await?;
    Ok(Json(detail))
}
