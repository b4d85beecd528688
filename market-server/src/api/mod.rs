//! HTTP API
//!
//! - [`health`] - liveness check
//! - [`orders`] - checkout, order reads and status transitions
//! - [`ratings`] - rating submission
//! - [`businesses`] - vendor ratings and trust score
//! - [`consumers`] - buyer trust score
//!
//! Every route except `/health` authenticates through the [`Principal`]
//! extractor.
//!
//! [`Principal`]: crate::auth::Principal

pub mod extract;

pub mod businesses;
pub mod consumers;
pub mod health;
pub mod orders;
pub mod ratings;

use std::time::Duration;

use axum::{Router, middleware};
use http::HeaderName;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::core::ServerState;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// HTTP access log
async fn log_request(
    request: http::Request<axum::body::Body>,
    next: middleware::Next,
) -> http::Response<axum::body::Body> {
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = next.run(request).await;

    tracing::info!(target: "http_access", "{} {} {}", method, uri, response.status());

    response
}

/// Build the Axum router (without state)
pub fn build_app() -> Router<ServerState> {
    Router::<ServerState>::new()
        .merge(health::router())
        .merge(orders::router())
        .merge(ratings::router())
        .merge(businesses::router())
        .merge(consumers::router())
}

/// Router with state and the tower middleware stack
pub fn router(state: ServerState, request_timeout: Duration) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    build_app()
        .with_state(state)
        .layer(TimeoutLayer::with_status_code(
            http::StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(CorsLayer::permissive())
        .layer(middleware::from_fn(log_request))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
}
