//! In-memory store
//!
//! One mutex guards the whole state. A unit of work takes the lock for its
//! whole lifetime and edits a private copy, so units of work are fully
//! serialized and a dropped one leaves no trace. The same constraints as the
//! PostgreSQL schema are enforced: non-negative stock, item quantity >= 1,
//! stars in 1..=5, one rating per (order, direction).

use async_trait::async_trait;
use shared::models::{
    Order, OrderItem, OrderStatus, Product, Rating, RatingDirection, StatusChange, TrustScore,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{
    MarketStore, OrderFilter, RATING_UNIQUE_CONSTRAINT, StoreError, StoreResult, StoreTx,
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    businesses: HashSet<i64>,
    consumers: HashSet<i64>,
    products: BTreeMap<i64, Product>,
    orders: BTreeMap<i64, Order>,
    items: Vec<OrderItem>,
    history: Vec<StatusChange>,
    ratings: Vec<Rating>,
    scores: HashMap<(RatingDirection, i64), TrustScore>,
}

/// Store backed by process memory
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a business (vendor) mirrored from the profile service
    pub async fn add_business(&self, business_id: i64) {
        self.state.lock().await.businesses.insert(business_id);
    }

    /// Register a consumer (buyer) mirrored from the identity service
    pub async fn add_consumer(&self, consumer_id: i64) {
        self.state.lock().await.consumers.insert(consumer_id);
    }

    /// Insert or replace a catalog product (vendor catalog edits)
    pub async fn put_product(&self, product: Product) {
        let mut state = self.state.lock().await;
        state.businesses.insert(product.vendor_id);
        state.products.insert(product.id, product);
    }

    /// Current product row
    pub async fn product(&self, product_id: i64) -> Option<Product> {
        self.state.lock().await.products.get(&product_id).cloned()
    }

    /// Number of orders ever created for a vendor
    pub async fn order_count_for_vendor(&self, vendor_id: i64) -> usize {
        self.state
            .lock()
            .await
            .orders
            .values()
            .filter(|o| o.vendor_id == vendor_id)
            .count()
    }

    /// Number of ratings stored for an order
    pub async fn rating_count_for_order(&self, order_id: i64) -> usize {
        self.state
            .lock()
            .await
            .ratings
            .iter()
            .filter(|r| r.order_id == order_id)
            .count()
    }
}

#[async_trait]
impl MarketStore for MemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTx { guard, working }))
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

fn ratee_exists(state: &MemoryState, direction: RatingDirection, ratee_id: i64) -> bool {
    match direction {
        RatingDirection::BuyerToVendor => state.businesses.contains(&ratee_id),
        RatingDirection::VendorToBuyer => state.consumers.contains(&ratee_id),
    }
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn business_exists(&mut self, business_id: i64) -> StoreResult<bool> {
        Ok(self.working.businesses.contains(&business_id))
    }

    async fn consumer_exists(&mut self, consumer_id: i64) -> StoreResult<bool> {
        Ok(self.working.consumers.contains(&consumer_id))
    }

    async fn get_products(&mut self, ids: &[i64]) -> StoreResult<Vec<Product>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.working.products.get(id).cloned())
            .collect())
    }

    async fn try_decrement_stock(&mut self, product_id: i64, qty: i32) -> StoreResult<bool> {
        match self.working.products.get_mut(&product_id) {
            Some(product) if product.quantity >= qty => {
                product.quantity -= qty;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn increment_stock(&mut self, product_id: i64, qty: i32) -> StoreResult<bool> {
        match self.working.products.get_mut(&product_id) {
            Some(product) => {
                product.quantity = product
                    .quantity
                    .checked_add(qty)
                    .ok_or_else(|| StoreError::CheckViolation("products_quantity_check".into()))?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_order(&mut self, order: &Order, items: &[OrderItem]) -> StoreResult<()> {
        if self.working.orders.contains_key(&order.id) {
            return Err(StoreError::UniqueViolation("orders_pkey".into()));
        }
        if items.iter().any(|item| item.quantity < 1) {
            return Err(StoreError::CheckViolation("order_items_quantity_check".into()));
        }
        self.working.orders.insert(order.id, order.clone());
        self.working.items.extend(items.iter().cloned());
        Ok(())
    }

    async fn get_order(&mut self, order_id: i64) -> StoreResult<Option<Order>> {
        Ok(self.working.orders.get(&order_id).cloned())
    }

    async fn get_order_items(&mut self, order_id: i64) -> StoreResult<Vec<OrderItem>> {
        Ok(self
            .working
            .items
            .iter()
            .filter(|item| item.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn list_orders(&mut self, filter: &OrderFilter) -> StoreResult<Vec<Order>> {
        let mut orders: Vec<Order> = self
            .working
            .orders
            .values()
            .filter(|o| filter.buyer_id.is_none_or(|id| o.buyer_id == id))
            .filter(|o| filter.vendor_id.is_none_or(|id| o.vendor_id == id))
            .filter(|o| filter.status.is_none_or(|s| o.status == s))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(orders
            .into_iter()
            .skip(filter.offset.max(0) as usize)
            .take(filter.limit.max(0) as usize)
            .collect())
    }

    async fn compare_and_set_status(
        &mut self,
        order_id: i64,
        expected: OrderStatus,
        next: OrderStatus,
        now: i64,
    ) -> StoreResult<bool> {
        match self.working.orders.get_mut(&order_id) {
            Some(order) if order.status == expected => {
                order.status = next;
                order.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn append_status_change(&mut self, change: &StatusChange) -> StoreResult<()> {
        self.working.history.push(change.clone());
        Ok(())
    }

    async fn status_history(&mut self, order_id: i64) -> StoreResult<Vec<StatusChange>> {
        Ok(self
            .working
            .history
            .iter()
            .filter(|c| c.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn lock_ratee(
        &mut self,
        direction: RatingDirection,
        ratee_id: i64,
    ) -> StoreResult<bool> {
        // The unit of work already holds the global lock
        Ok(ratee_exists(&self.working, direction, ratee_id))
    }

    async fn find_rating(
        &mut self,
        order_id: i64,
        direction: RatingDirection,
    ) -> StoreResult<Option<Rating>> {
        Ok(self
            .working
            .ratings
            .iter()
            .find(|r| r.order_id == order_id && r.direction == direction)
            .cloned())
    }

    async fn insert_rating(&mut self, rating: &Rating) -> StoreResult<()> {
        let duplicate = self
            .working
            .ratings
            .iter()
            .any(|r| r.order_id == rating.order_id && r.direction == rating.direction);
        if duplicate {
            return Err(StoreError::UniqueViolation(RATING_UNIQUE_CONSTRAINT.into()));
        }
        if !(1..=5).contains(&rating.stars) {
            return Err(StoreError::CheckViolation("ratings_stars_check".into()));
        }
        self.working.ratings.push(rating.clone());
        Ok(())
    }

    async fn ratings_received(
        &mut self,
        direction: RatingDirection,
        ratee_id: i64,
    ) -> StoreResult<Vec<Rating>> {
        let mut ratings: Vec<Rating> = self
            .working
            .ratings
            .iter()
            .filter(|r| r.direction == direction && r.ratee_id == ratee_id)
            .cloned()
            .collect();
        ratings.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(ratings)
    }

    async fn save_trust_score(
        &mut self,
        direction: RatingDirection,
        score: &TrustScore,
    ) -> StoreResult<()> {
        self.working
            .scores
            .insert((direction, score.ratee_id), score.clone());
        Ok(())
    }

    async fn trust_score(
        &mut self,
        direction: RatingDirection,
        ratee_id: i64,
    ) -> StoreResult<Option<TrustScore>> {
        Ok(self.working.scores.get(&(direction, ratee_id)).cloned())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryTx { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}
