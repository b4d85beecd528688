//! Storage layer
//!
//! Components never hold a connection of their own: they receive an
//! `Arc<dyn MarketStore>` at construction and open one [`StoreTx`] per unit
//! of work. Everything done through a `StoreTx` becomes visible atomically
//! on [`StoreTx::commit`]; dropping it without committing rolls back.
//!
//! | Backend | Type | Use |
//! |---------|------|-----|
//! | PostgreSQL | [`PgStore`] | production |
//! | In-memory | [`MemoryStore`] | tests, local demos |

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use shared::error::{AppError, ErrorCode};
use shared::models::{
    Order, OrderItem, OrderStatus, Product, Rating, RatingDirection, StatusChange, TrustScore,
};
use thiserror::Error;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Name of the uniqueness constraint guarding one rating per (order, direction)
pub const RATING_UNIQUE_CONSTRAINT: &str = "ratings_order_direction_key";

/// Storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Check constraint violated: {0}")]
    CheckViolation(String),

    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let Some(db_err) = e.as_database_error() {
            let constraint = db_err.constraint().unwrap_or_default().to_string();
            if db_err.is_unique_violation() {
                return StoreError::UniqueViolation(constraint);
            }
            if db_err.is_check_violation() {
                return StoreError::CheckViolation(constraint);
            }
        }
        StoreError::Database(e)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        tracing::error!(error = %err, "Storage error occurred");
        AppError::with_message(ErrorCode::DatabaseError, err.to_string())
    }
}

/// Filter for listing orders, newest first
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub buyer_id: Option<i64>,
    pub vendor_id: Option<i64>,
    pub status: Option<OrderStatus>,
    pub limit: i64,
    pub offset: i64,
}

/// Factory for units of work
#[async_trait]
pub trait MarketStore: Send + Sync + 'static {
    /// Open a unit of work (read-committed or stricter)
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>>;

    /// Backend name for logs and health output
    fn backend(&self) -> &'static str;
}

/// One unit of work against the store
///
/// Stock primitives are only called by the inventory ledger.
#[async_trait]
pub trait StoreTx: Send {
    // ── Parties ──

    async fn business_exists(&mut self, business_id: i64) -> StoreResult<bool>;

    async fn consumer_exists(&mut self, consumer_id: i64) -> StoreResult<bool>;

    // ── Catalog / stock ──

    /// Products with the given ids; unknown ids are skipped
    async fn get_products(&mut self, ids: &[i64]) -> StoreResult<Vec<Product>>;

    /// Decrement only if current quantity >= `qty`. Returns whether a row changed.
    async fn try_decrement_stock(&mut self, product_id: i64, qty: i32) -> StoreResult<bool>;

    /// Re-increment. Returns false if the product does not exist.
    async fn increment_stock(&mut self, product_id: i64, qty: i32) -> StoreResult<bool>;

    // ── Orders ──

    async fn insert_order(&mut self, order: &Order, items: &[OrderItem]) -> StoreResult<()>;

    async fn get_order(&mut self, order_id: i64) -> StoreResult<Option<Order>>;

    async fn get_order_items(&mut self, order_id: i64) -> StoreResult<Vec<OrderItem>>;

    async fn list_orders(&mut self, filter: &OrderFilter) -> StoreResult<Vec<Order>>;

    /// Set status to `next` only if it is still `expected`. Returns whether a row changed.
    async fn compare_and_set_status(
        &mut self,
        order_id: i64,
        expected: OrderStatus,
        next: OrderStatus,
        now: i64,
    ) -> StoreResult<bool>;

    async fn append_status_change(&mut self, change: &StatusChange) -> StoreResult<()>;

    /// Oldest first
    async fn status_history(&mut self, order_id: i64) -> StoreResult<Vec<StatusChange>>;

    // ── Ratings ──

    /// Serialize aggregate recomputation per ratee. Returns false if the ratee does not exist.
    async fn lock_ratee(&mut self, direction: RatingDirection, ratee_id: i64)
    -> StoreResult<bool>;

    async fn find_rating(
        &mut self,
        order_id: i64,
        direction: RatingDirection,
    ) -> StoreResult<Option<Rating>>;

    /// Fails with [`StoreError::UniqueViolation`] if (order_id, direction) already exists
    async fn insert_rating(&mut self, rating: &Rating) -> StoreResult<()>;

    /// Newest first
    async fn ratings_received(
        &mut self,
        direction: RatingDirection,
        ratee_id: i64,
    ) -> StoreResult<Vec<Rating>>;

    async fn save_trust_score(
        &mut self,
        direction: RatingDirection,
        score: &TrustScore,
    ) -> StoreResult<()>;

    async fn trust_score(
        &mut self,
        direction: RatingDirection,
        ratee_id: i64,
    ) -> StoreResult<Option<TrustScore>>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;
}
