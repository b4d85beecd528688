//! Rating and trust score models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Which party rates whom
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RatingDirection {
    /// Buyer rates the vendor (ratee is a business)
    BuyerToVendor,
    /// Vendor rates the buyer (ratee is a consumer)
    VendorToBuyer,
}

impl RatingDirection {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::BuyerToVendor => "buyer_to_vendor",
            Self::VendorToBuyer => "vendor_to_buyer",
        }
    }
}

impl fmt::Display for RatingDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RatingDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buyer_to_vendor" => Ok(Self::BuyerToVendor),
            "vendor_to_buyer" => Ok(Self::VendorToBuyer),
            other => Err(format!("unknown rating direction: {other}")),
        }
    }
}

/// Directional rating tied to one order, immutable once written
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rating {
    pub id: i64,
    pub order_id: i64,
    /// Buyer id (buyer_to_vendor) or business id (vendor_to_buyer)
    pub rater_id: i64,
    /// Business id (buyer_to_vendor) or buyer id (vendor_to_buyer)
    pub ratee_id: i64,
    pub direction: RatingDirection,
    /// 1..=5
    pub stars: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review: Option<String>,
    /// Named sub-scores, each 1..=5
    #[serde(default)]
    pub criteria: BTreeMap<String, i32>,
    pub created_at: i64,
}

/// Aggregate reputation of a ratee, derived from the rating ledger
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrustScore {
    pub ratee_id: i64,
    pub total_ratings: i64,
    /// Mean stars, rounded to the configured precision
    pub average_stars: Decimal,
    /// Mean per criterion, over the ratings that declared it
    #[serde(default)]
    pub criteria: BTreeMap<String, Decimal>,
    pub updated_at: i64,
}

impl TrustScore {
    /// Score of a ratee that has not been rated yet
    pub fn empty(ratee_id: i64, now: i64) -> Self {
        Self {
            ratee_id,
            total_ratings: 0,
            average_stars: Decimal::ZERO,
            criteria: BTreeMap::new(),
            updated_at: now,
        }
    }
}
