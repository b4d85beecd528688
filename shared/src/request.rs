//! Request types for the marketplace API

use crate::models::{DeliveryMethod, OrderStatus, RatingDirection};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One cart line: a product and how many units
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CartLine {
    pub product_id: i64,
    pub quantity: i32,
}

/// POST /orders body: a cart possibly spanning several vendors
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CreateOrdersRequest {
    #[serde(default)]
    pub items: Vec<CartLine>,
    #[serde(default)]
    pub delivery_method: DeliveryMethod,
    pub contact_name: Option<String>,
    pub contact_phone: Option<String>,
    /// Required when `delivery_method` is `delivery`
    pub delivery_address: Option<String>,
    pub notes: Option<String>,
}

/// PATCH /orders/:id/status body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
    pub reason: Option<String>,
}

/// POST /ratings body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRatingRequest {
    pub order_id: i64,
    pub direction: RatingDirection,
    pub stars: i32,
    pub review: Option<String>,
    #[serde(default)]
    pub criteria: BTreeMap<String, i32>,
}

/// GET /orders query parameters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderListQuery {
    pub status: Option<OrderStatus>,
    /// Page size (default: 50, max: 200)
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

impl OrderListQuery {
    pub const MAX_LIMIT: i64 = 200;

    /// Limit clamped to 1..=MAX_LIMIT
    pub fn limit(&self) -> i64 {
        self.limit.clamp(1, Self::MAX_LIMIT)
    }

    /// Offset clamped to >= 0
    pub fn offset(&self) -> i64 {
        self.offset.max(0)
    }
}
