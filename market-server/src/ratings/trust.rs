//! Trust score aggregation
//!
//! Aggregates are always recomputed from every rating the ratee has
//! received, never patched incrementally.

use rust_decimal::{Decimal, RoundingStrategy};
use shared::models::{Rating, RatingDirection, TrustScore};
use shared::util::now_millis;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::error::{RatingError, RatingResult};
use crate::db::{MarketStore, StoreResult, StoreTx};

fn mean(sum: i64, count: i64, precision: u32) -> Decimal {
    if count == 0 {
        return Decimal::ZERO.round_dp(precision);
    }
    (Decimal::from(sum) / Decimal::from(count))
        .round_dp_with_strategy(precision, RoundingStrategy::MidpointAwayFromZero)
}

/// Aggregate `ratings` received by `ratee_id`
///
/// Each criterion is averaged over the ratings that carry it.
pub fn aggregate(ratee_id: i64, ratings: &[Rating], precision: u32, now: i64) -> TrustScore {
    let total = ratings.len() as i64;
    let stars: i64 = ratings.iter().map(|r| i64::from(r.stars)).sum();

    let mut criteria_sums: BTreeMap<&str, (i64, i64)> = BTreeMap::new();
    for rating in ratings {
        for (key, value) in &rating.criteria {
            let entry = criteria_sums.entry(key.as_str()).or_default();
            entry.0 += i64::from(*value);
            entry.1 += 1;
        }
    }

    TrustScore {
        ratee_id,
        total_ratings: total,
        average_stars: mean(stars, total, precision),
        criteria: criteria_sums
            .into_iter()
            .map(|(key, (sum, count))| (key.to_string(), mean(sum, count, precision)))
            .collect(),
        updated_at: now,
    }
}

/// Recomputes and persists ratee aggregates
#[derive(Clone)]
pub struct TrustScoreAggregator {
    store: Arc<dyn MarketStore>,
    precision: u32,
}

impl TrustScoreAggregator {
    pub fn new(store: Arc<dyn MarketStore>, precision: u32) -> Self {
        Self { store, precision }
    }

    pub fn precision(&self) -> u32 {
        self.precision
    }

    /// Recompute inside the caller's unit of work. The caller holds the ratee lock.
    pub async fn recompute_in(
        &self,
        tx: &mut dyn StoreTx,
        direction: RatingDirection,
        ratee_id: i64,
    ) -> StoreResult<TrustScore> {
        let ratings = tx.ratings_received(direction, ratee_id).await?;
        let score = aggregate(ratee_id, &ratings, self.precision, now_millis());
        tx.save_trust_score(direction, &score).await?;

        tracing::debug!(
            ratee_id,
            direction = %direction,
            total = score.total_ratings,
            average = %score.average_stars,
            "Trust score recomputed"
        );
        Ok(score)
    }

    /// Recompute in a unit of work of its own
    pub async fn recompute(
        &self,
        direction: RatingDirection,
        ratee_id: i64,
    ) -> RatingResult<TrustScore> {
        let mut tx = self.store.begin().await?;
        if !tx.lock_ratee(direction, ratee_id).await? {
            return Err(RatingError::ratee_not_found(direction, ratee_id));
        }
        let score = self.recompute_in(tx.as_mut(), direction, ratee_id).await?;
        tx.commit().await?;
        Ok(score)
    }

    /// Current aggregate; a ratee without ratings gets an empty score
    pub async fn score(
        &self,
        direction: RatingDirection,
        ratee_id: i64,
    ) -> RatingResult<TrustScore> {
        let mut tx = self.store.begin().await?;
        let exists = match direction {
            RatingDirection::BuyerToVendor => tx.business_exists(ratee_id).await?,
            RatingDirection::VendorToBuyer => tx.consumer_exists(ratee_id).await?,
        };
        if !exists {
            return Err(RatingError::ratee_not_found(direction, ratee_id));
        }

        let score = tx.trust_score(direction, ratee_id).await?;
        Ok(score
            .filter(|s| s.total_ratings > 0)
            .unwrap_or_else(|| {
                let mut empty = TrustScore::empty(ratee_id, now_millis());
                empty.average_stars = Decimal::ZERO.round_dp(self.precision);
                empty
            }))
    }
}
