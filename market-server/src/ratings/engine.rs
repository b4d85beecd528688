//! Directional ratings
//!
//! One rating per (order, direction), only once the order is delivered. The
//! existence check is a fast path; the store's uniqueness constraint is what
//! actually serializes concurrent submissions. The ratee row is locked before
//! the insert so aggregate recomputation for one ratee never interleaves.

use shared::error::{AppError, ErrorCode};
use shared::models::{Order, OrderStatus, Rating, RatingDirection};
use shared::request::CreateRatingRequest;
use shared::util::{now_millis, snowflake_id};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::error::{RatingError, RatingResult};
use super::trust::TrustScoreAggregator;
use crate::audit_log;
use crate::auth::{Principal, Role};
use crate::db::{MarketStore, RATING_UNIQUE_CONSTRAINT, StoreError};
use crate::notify::{self, Notification, Notifier};
use crate::utils::validation::{
    MAX_CRITERIA, MAX_CRITERION_KEY_LEN, MAX_REVIEW_LEN, normalize_optional,
    validate_optional_text, validate_required_text, validate_score,
};

/// Validated rating input
#[derive(Debug, Clone)]
struct RatingInput {
    stars: i32,
    review: Option<String>,
    criteria: BTreeMap<String, i32>,
}

fn validate_input(req: &CreateRatingRequest) -> Result<RatingInput, AppError> {
    validate_score(req.stars, "stars")?;
    validate_optional_text(&req.review, "review", MAX_REVIEW_LEN)?;

    if req.criteria.len() > MAX_CRITERIA {
        return Err(AppError::with_message(
            ErrorCode::InvalidRating,
            format!("At most {MAX_CRITERIA} criteria per rating"),
        )
        .with_detail("criteria", req.criteria.len()));
    }

    let mut criteria = BTreeMap::new();
    for (key, value) in &req.criteria {
        validate_required_text(key, "criterion", MAX_CRITERION_KEY_LEN)?;
        validate_score(*value, key)?;
        let name = key.trim().to_string();
        if criteria.insert(name.clone(), *value).is_some() {
            return Err(AppError::with_message(
                ErrorCode::InvalidRating,
                format!("Criterion '{name}' is given more than once"),
            )
            .with_detail("criterion", name));
        }
    }

    Ok(RatingInput {
        stars: req.stars,
        review: normalize_optional(&req.review),
        criteria,
    })
}

/// Resolve (rater, ratee) for `principal` rating `order` in `direction`
fn resolve_parties(
    order: &Order,
    principal: &Principal,
    direction: RatingDirection,
) -> RatingResult<(i64, i64)> {
    let is_buyer = principal.role == Role::Buyer && order.is_buyer(principal.user_id);
    let is_vendor = principal
        .business_id()
        .is_some_and(|business_id| order.is_vendor(business_id));

    if !is_buyer && !is_vendor {
        return Err(RatingError::PermissionDenied(format!(
            "order {} does not belong to the caller",
            order.id
        )));
    }

    if order.status != OrderStatus::Delivered {
        return Err(RatingError::NotDelivered {
            order_id: order.id,
            status: order.status,
        });
    }

    match direction {
        RatingDirection::BuyerToVendor if is_buyer => Ok((order.buyer_id, order.vendor_id)),
        RatingDirection::VendorToBuyer if is_vendor => Ok((order.vendor_id, order.buyer_id)),
        _ => Err(RatingError::WrongRater { direction }),
    }
}

#[derive(Clone)]
pub struct RatingEngine {
    store: Arc<dyn MarketStore>,
    aggregator: TrustScoreAggregator,
    notifier: Arc<dyn Notifier>,
}

impl RatingEngine {
    pub fn new(
        store: Arc<dyn MarketStore>,
        aggregator: TrustScoreAggregator,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            aggregator,
            notifier,
        }
    }

    pub fn aggregator(&self) -> &TrustScoreAggregator {
        &self.aggregator
    }

    /// Record a rating and recompute the ratee's aggregate in the same unit of work
    pub async fn create_rating(
        &self,
        principal: &Principal,
        req: &CreateRatingRequest,
    ) -> RatingResult<Rating> {
        let input = validate_input(req).map_err(RatingError::Validation)?;
        let direction = req.direction;

        let mut tx = self.store.begin().await?;

        let order = tx
            .get_order(req.order_id)
            .await?
            .ok_or(RatingError::OrderNotFound(req.order_id))?;
        let (rater_id, ratee_id) = resolve_parties(&order, principal, direction)?;

        if !tx.lock_ratee(direction, ratee_id).await? {
            return Err(RatingError::ratee_not_found(direction, ratee_id));
        }

        let duplicate = RatingError::Duplicate {
            order_id: order.id,
            direction,
        };
        if tx.find_rating(order.id, direction).await?.is_some() {
            return Err(duplicate);
        }

        let rating = Rating {
            id: snowflake_id(),
            order_id: order.id,
            rater_id,
            ratee_id,
            direction,
            stars: input.stars,
            review: input.review,
            criteria: input.criteria,
            created_at: now_millis(),
        };

        match tx.insert_rating(&rating).await {
            Ok(()) => {}
            Err(StoreError::UniqueViolation(constraint))
                if constraint == RATING_UNIQUE_CONSTRAINT =>
            {
                return Err(duplicate);
            }
            Err(e) => return Err(e.into()),
        }

        let score = self
            .aggregator
            .recompute_in(tx.as_mut(), direction, ratee_id)
            .await?;
        tx.commit().await?;

        tracing::info!(
            rating_id = rating.id,
            order_id = rating.order_id,
            direction = %direction,
            ratee_id,
            stars = rating.stars,
            average = %score.average_stars,
            "Rating recorded"
        );
        audit_log!(
            principal.user_id,
            "create_rating",
            format!("order:{}", rating.order_id),
            direction.as_str()
        );
        notify::dispatch(&self.notifier, Notification::RatingReceived(rating.clone()));

        Ok(rating)
    }

    /// Ratings a vendor has received, newest first
    pub async fn ratings_for_business(&self, business_id: i64) -> RatingResult<Vec<Rating>> {
        let mut tx = self.store.begin().await?;
        if !tx.business_exists(business_id).await? {
            return Err(RatingError::BusinessNotFound(business_id));
        }
        Ok(tx
            .ratings_received(RatingDirection::BuyerToVendor, business_id)
            .await?)
    }
}
