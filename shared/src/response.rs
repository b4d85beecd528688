//! API Response types

use crate::error::{AppError, ErrorCode};
use crate::models::OrderDetail;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// A vendor group of the cart that did not become an order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VendorFailure {
    pub vendor_id: i64,
    /// Products of this vendor's group
    pub product_ids: Vec<i64>,
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, Value>>,
}

impl VendorFailure {
    pub fn from_error(vendor_id: i64, product_ids: Vec<i64>, err: &AppError) -> Self {
        Self {
            vendor_id,
            product_ids,
            code: err.code,
            message: err.message.clone(),
            details: err.details.clone(),
        }
    }
}

/// POST /orders result: one order per vendor that succeeded, one failure per vendor that did not
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CheckoutResponse {
    pub orders: Vec<OrderDetail>,
    pub failures: Vec<VendorFailure>,
}

/// GET /health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
