//! PostgreSQL store
//!
//! Each unit of work is one `sqlx::Transaction` at the default READ COMMITTED
//! level. The two contended writes are single conditional statements:
//!
//! - stock: `UPDATE products SET quantity = quantity - $2 WHERE id = $1 AND quantity >= $2`
//! - status: `UPDATE orders SET status = $3 WHERE id = $1 AND status = $2`
//!
//! and rating uniqueness is the `ratings_order_direction_key` constraint.
//!
//! Row locks are always taken in ascending product id order, and the ratee
//! lock is `FOR NO KEY UPDATE` so it does not wait on the `FOR KEY SHARE`
//! locks that order and product inserts take on the same party row.

use async_trait::async_trait;
use rust_decimal::Decimal;
use shared::models::{
    DeliveryMethod, Order, OrderItem, OrderStatus, PaymentStatus, Product, Rating,
    RatingDirection, StatusChange, TrustScore,
};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::{Postgres, Transaction};
use std::collections::BTreeMap;
use std::str::FromStr;

use super::{MarketStore, OrderFilter, StoreError, StoreResult, StoreTx};

/// Store backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and run pending migrations
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!(max_connections, "PostgreSQL store ready");

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl MarketStore for PgStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTx { tx }))
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}

struct PgTx {
    tx: Transaction<'static, Postgres>,
}

// ── Row types ──

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: i64,
    vendor_id: i64,
    name: String,
    price: Decimal,
    quantity: i32,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            vendor_id: row.vendor_id,
            name: row.name,
            price: row.price,
            quantity: row.quantity,
        }
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: i64,
    buyer_id: i64,
    vendor_id: i64,
    total_amount: Decimal,
    status: String,
    delivery_method: String,
    payment_status: String,
    contact_name: Option<String>,
    contact_phone: Option<String>,
    delivery_address: Option<String>,
    notes: Option<String>,
    created_at: i64,
    updated_at: i64,
}

fn parse_column<T: FromStr<Err = String>>(value: &str) -> StoreResult<T> {
    value.parse().map_err(StoreError::Corrupt)
}

impl TryFrom<OrderRow> for Order {
    type Error = StoreError;

    fn try_from(row: OrderRow) -> StoreResult<Self> {
        Ok(Self {
            id: row.id,
            buyer_id: row.buyer_id,
            vendor_id: row.vendor_id,
            total_amount: row.total_amount,
            status: parse_column::<OrderStatus>(&row.status)?,
            delivery_method: parse_column::<DeliveryMethod>(&row.delivery_method)?,
            payment_status: parse_column::<PaymentStatus>(&row.payment_status)?,
            contact_name: row.contact_name,
            contact_phone: row.contact_phone,
            delivery_address: row.delivery_address,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    id: i64,
    order_id: i64,
    product_id: i64,
    quantity: i32,
    price_at_purchase: Decimal,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        Self {
            id: row.id,
            order_id: row.order_id,
            product_id: row.product_id,
            quantity: row.quantity,
            price_at_purchase: row.price_at_purchase,
        }
    }
}

#[derive(sqlx::FromRow)]
struct StatusChangeRow {
    id: i64,
    order_id: i64,
    from_status: Option<String>,
    to_status: String,
    actor_id: i64,
    reason: Option<String>,
    created_at: i64,
}

impl TryFrom<StatusChangeRow> for StatusChange {
    type Error = StoreError;

    fn try_from(row: StatusChangeRow) -> StoreResult<Self> {
        Ok(Self {
            id: row.id,
            order_id: row.order_id,
            from_status: row
                .from_status
                .as_deref()
                .map(parse_column::<OrderStatus>)
                .transpose()?,
            to_status: parse_column::<OrderStatus>(&row.to_status)?,
            actor_id: row.actor_id,
            reason: row.reason,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct RatingRow {
    id: i64,
    order_id: i64,
    rater_id: i64,
    ratee_id: i64,
    direction: String,
    stars: i32,
    review: Option<String>,
    criteria: Json<BTreeMap<String, i32>>,
    created_at: i64,
}

impl TryFrom<RatingRow> for Rating {
    type Error = StoreError;

    fn try_from(row: RatingRow) -> StoreResult<Self> {
        Ok(Self {
            id: row.id,
            order_id: row.order_id,
            rater_id: row.rater_id,
            ratee_id: row.ratee_id,
            direction: parse_column::<RatingDirection>(&row.direction)?,
            stars: row.stars,
            review: row.review,
            criteria: row.criteria.0,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct TrustScoreRow {
    id: i64,
    total_ratings: i64,
    average_stars: Decimal,
    criteria_scores: Json<BTreeMap<String, Decimal>>,
    updated_at: i64,
}

impl From<TrustScoreRow> for TrustScore {
    fn from(row: TrustScoreRow) -> Self {
        Self {
            ratee_id: row.id,
            total_ratings: row.total_ratings,
            average_stars: row.average_stars,
            criteria: row.criteria_scores.0,
            updated_at: row.updated_at,
        }
    }
}

const ORDER_COLUMNS: &str = "id, buyer_id, vendor_id, total_amount, status, delivery_method, \
     payment_status, contact_name, contact_phone, delivery_address, notes, created_at, updated_at";

const RATING_COLUMNS: &str =
    "id, order_id, rater_id, ratee_id, direction, stars, review, criteria, created_at";

#[async_trait]
impl StoreTx for PgTx {
    async fn business_exists(&mut self, business_id: i64) -> StoreResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM businesses WHERE id = $1)")
            .bind(business_id)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(exists)
    }

    async fn consumer_exists(&mut self, consumer_id: i64) -> StoreResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM consumers WHERE id = $1)")
            .bind(consumer_id)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(exists)
    }

    async fn get_products(&mut self, ids: &[i64]) -> StoreResult<Vec<Product>> {
        let rows: Vec<ProductRow> = sqlx::query_as(
            "SELECT id, vendor_id, name, price, quantity FROM products WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn try_decrement_stock(&mut self, product_id: i64, qty: i32) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE products SET quantity = quantity - $2 WHERE id = $1 AND quantity >= $2",
        )
        .bind(product_id)
        .bind(qty)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn increment_stock(&mut self, product_id: i64, qty: i32) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE products SET quantity = quantity + $2 WHERE id = $1")
            .bind(product_id)
            .bind(qty)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn insert_order(&mut self, order: &Order, items: &[OrderItem]) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (
                id, buyer_id, vendor_id, total_amount, status, delivery_method,
                payment_status, contact_name, contact_phone, delivery_address, notes,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(order.id)
        .bind(order.buyer_id)
        .bind(order.vendor_id)
        .bind(order.total_amount)
        .bind(order.status.as_str())
        .bind(order.delivery_method.as_str())
        .bind(order.payment_status.as_str())
        .bind(&order.contact_name)
        .bind(&order.contact_phone)
        .bind(&order.delivery_address)
        .bind(&order.notes)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *self.tx)
        .await?;

        if !items.is_empty() {
            let ids: Vec<i64> = items.iter().map(|i| i.id).collect();
            let order_ids: Vec<i64> = items.iter().map(|i| i.order_id).collect();
            let product_ids: Vec<i64> = items.iter().map(|i| i.product_id).collect();
            let quantities: Vec<i32> = items.iter().map(|i| i.quantity).collect();
            let prices: Vec<Decimal> = items.iter().map(|i| i.price_at_purchase).collect();
            sqlx::query(
                r#"
                INSERT INTO order_items (id, order_id, product_id, quantity, price_at_purchase)
                SELECT * FROM UNNEST($1::bigint[], $2::bigint[], $3::bigint[], $4::integer[], $5::numeric[])
                "#,
            )
            .bind(&ids)
            .bind(&order_ids)
            .bind(&product_ids)
            .bind(&quantities)
            .bind(&prices)
            .execute(&mut *self.tx)
            .await?;
        }

        Ok(())
    }

    async fn get_order(&mut self, order_id: i64) -> StoreResult<Option<Order>> {
        let row: Option<OrderRow> =
            sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
                .bind(order_id)
                .fetch_optional(&mut *self.tx)
                .await?;
        row.map(Order::try_from).transpose()
    }

    async fn get_order_items(&mut self, order_id: i64) -> StoreResult<Vec<OrderItem>> {
        let rows: Vec<OrderItemRow> = sqlx::query_as(
            "SELECT id, order_id, product_id, quantity, price_at_purchase \
             FROM order_items WHERE order_id = $1 ORDER BY id",
        )
        .bind(order_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(rows.into_iter().map(OrderItem::from).collect())
    }

    async fn list_orders(&mut self, filter: &OrderFilter) -> StoreResult<Vec<Order>> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            r#"
            SELECT {ORDER_COLUMNS}
            FROM orders
            WHERE ($1::BIGINT IS NULL OR buyer_id = $1)
              AND ($2::BIGINT IS NULL OR vendor_id = $2)
              AND ($3::TEXT IS NULL OR status = $3)
            ORDER BY created_at DESC, id DESC
            LIMIT $4 OFFSET $5
            "#
        ))
        .bind(filter.buyer_id)
        .bind(filter.vendor_id)
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(&mut *self.tx)
        .await?;
        rows.into_iter().map(Order::try_from).collect()
    }

    async fn compare_and_set_status(
        &mut self,
        order_id: i64,
        expected: OrderStatus,
        next: OrderStatus,
        now: i64,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE orders SET status = $3, updated_at = $4 WHERE id = $1 AND status = $2",
        )
        .bind(order_id)
        .bind(expected.as_str())
        .bind(next.as_str())
        .bind(now)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn append_status_change(&mut self, change: &StatusChange) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO order_status_history (id, order_id, from_status, to_status, actor_id, reason, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(change.id)
        .bind(change.order_id)
        .bind(change.from_status.map(|s| s.as_str()))
        .bind(change.to_status.as_str())
        .bind(change.actor_id)
        .bind(&change.reason)
        .bind(change.created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn status_history(&mut self, order_id: i64) -> StoreResult<Vec<StatusChange>> {
        let rows: Vec<StatusChangeRow> = sqlx::query_as(
            "SELECT id, order_id, from_status, to_status, actor_id, reason, created_at \
             FROM order_status_history WHERE order_id = $1 ORDER BY created_at, id",
        )
        .bind(order_id)
        .fetch_all(&mut *self.tx)
        .await?;
        rows.into_iter().map(StatusChange::try_from).collect()
    }

    async fn lock_ratee(
        &mut self,
        direction: RatingDirection,
        ratee_id: i64,
    ) -> StoreResult<bool> {
        let sql = match direction {
            RatingDirection::BuyerToVendor => {
                "SELECT id FROM businesses WHERE id = $1 FOR NO KEY UPDATE"
            }
            RatingDirection::VendorToBuyer => {
                "SELECT id FROM consumers WHERE id = $1 FOR NO KEY UPDATE"
            }
        };
        let row: Option<i64> = sqlx::query_scalar(sql)
            .bind(ratee_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row.is_some())
    }

    async fn find_rating(
        &mut self,
        order_id: i64,
        direction: RatingDirection,
    ) -> StoreResult<Option<Rating>> {
        let row: Option<RatingRow> = sqlx::query_as(&format!(
            "SELECT {RATING_COLUMNS} FROM ratings WHERE order_id = $1 AND direction = $2"
        ))
        .bind(order_id)
        .bind(direction.as_str())
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(Rating::try_from).transpose()
    }

    async fn insert_rating(&mut self, rating: &Rating) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO ratings (id, order_id, rater_id, ratee_id, direction, stars, review, criteria, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(rating.id)
        .bind(rating.order_id)
        .bind(rating.rater_id)
        .bind(rating.ratee_id)
        .bind(rating.direction.as_str())
        .bind(rating.stars)
        .bind(&rating.review)
        .bind(Json(&rating.criteria))
        .bind(rating.created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn ratings_received(
        &mut self,
        direction: RatingDirection,
        ratee_id: i64,
    ) -> StoreResult<Vec<Rating>> {
        let rows: Vec<RatingRow> = sqlx::query_as(&format!(
            "SELECT {RATING_COLUMNS} FROM ratings WHERE direction = $1 AND ratee_id = $2 \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(direction.as_str())
        .bind(ratee_id)
        .fetch_all(&mut *self.tx)
        .await?;
        rows.into_iter().map(Rating::try_from).collect()
    }

    async fn save_trust_score(
        &mut self,
        direction: RatingDirection,
        score: &TrustScore,
    ) -> StoreResult<()> {
        let sql = match direction {
            RatingDirection::BuyerToVendor => {
                "UPDATE businesses SET rating = $2, total_ratings = $3, criteria_scores = $4, \
                 rating_updated_at = $5 WHERE id = $1"
            }
            RatingDirection::VendorToBuyer => {
                "UPDATE consumers SET trust_score = $2, total_ratings = $3, criteria_scores = $4, \
                 trust_updated_at = $5 WHERE id = $1"
            }
        };
        sqlx::query(sql)
            .bind(score.ratee_id)
            .bind(score.average_stars)
            .bind(score.total_ratings)
            .bind(Json(&score.criteria))
            .bind(score.updated_at)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn trust_score(
        &mut self,
        direction: RatingDirection,
        ratee_id: i64,
    ) -> StoreResult<Option<TrustScore>> {
        let sql = match direction {
            RatingDirection::BuyerToVendor => {
                "SELECT id, total_ratings, rating AS average_stars, criteria_scores, \
                 rating_updated_at AS updated_at FROM businesses WHERE id = $1"
            }
            RatingDirection::VendorToBuyer => {
                "SELECT id, total_ratings, trust_score AS average_stars, criteria_scores, \
                 trust_updated_at AS updated_at FROM consumers WHERE id = $1"
            }
        };
        let row: Option<TrustScoreRow> = sqlx::query_as(sql)
            .bind(ratee_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row.map(TrustScore::from))
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
