//! Concurrency tests against a live PostgreSQL
//!
//! These exercise the row-level primitives the in-memory store cannot:
//! the conditional stock decrement, the status compare-and-set, the ratee
//! lock and the `(order_id, direction)` uniqueness constraint.
//!
//! Set `DATABASE_URL` to a scratch database to run them; without it every
//! test returns immediately. Ids are snowflakes, so runs can share a
//! database.
//!
//! ```text
//! DATABASE_URL=postgres://localhost/market_test cargo test --test postgres_store
//! ```

use std::sync::Arc;
use std::time::Duration;

use market_server::ServerState;
use market_server::auth::{JwtConfig, JwtService, Principal};
use market_server::db::{MarketStore, PgStore};
use market_server::inventory::LedgerError;
use market_server::notify::LogNotifier;
use market_server::orders::OrderError;
use market_server::ratings::RatingError;
use rust_decimal::Decimal;
use shared::models::{
    DeliveryMethod, Order, OrderItem, OrderStatus, PaymentStatus, RatingDirection,
};
use shared::request::{CartLine, CreateOrdersRequest, CreateRatingRequest};
use shared::util::{now_millis, snowflake_id};

const POOL_SIZE: u32 = 16;

struct PgFixture {
    store: PgStore,
    state: ServerState,
    vendor_id: i64,
    buyer_id: i64,
}

impl PgFixture {
    /// `None` when no database is configured
    async fn connect() -> Option<Self> {
        let url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.is_empty())?;
        let store = PgStore::connect(&url, POOL_SIZE).await.unwrap();

        let vendor_id = snowflake_id();
        let buyer_id = snowflake_id();
        sqlx::query("INSERT INTO businesses (id, name) VALUES ($1, 'test vendor')")
            .bind(vendor_id)
            .execute(store.pool())
            .await
            .unwrap();
        sqlx::query("INSERT INTO consumers (id, display_name) VALUES ($1, 'test buyer')")
            .bind(buyer_id)
            .execute(store.pool())
            .await
            .unwrap();

        let jwt = JwtService::with_config(JwtConfig::new("test-secret", "market-test"));
        let state = ServerState::build(Arc::new(store.clone()), jwt, 2, Arc::new(LogNotifier));

        Some(Self {
            store,
            state,
            vendor_id,
            buyer_id,
        })
    }

    async fn product(&self, price: Decimal, quantity: i32) -> i64 {
        let id = snowflake_id();
        sqlx::query("INSERT INTO products (id, vendor_id, name, price, quantity) VALUES ($1, $2, $3, $4, $5)")
            .bind(id)
            .bind(self.vendor_id)
            .bind(format!("product-{id}"))
            .bind(price)
            .bind(quantity)
            .execute(self.store.pool())
            .await
            .unwrap();
        id
    }

    fn vendor(&self) -> Principal {
        Principal::vendor(self.vendor_id + 1, self.vendor_id)
    }

    async fn stock(&self, product_id: i64) -> i32 {
        self.state.ledger.available(product_id).await.unwrap()
    }

    async fn checkout(&self, lines: &[(i64, i32)]) -> i64 {
        let req = cart(lines);
        let response = self
            .state
            .orchestrator
            .checkout(self.buyer_id, &req)
            .await
            .unwrap();
        assert!(response.failures.is_empty(), "{:?}", response.failures);
        response.orders[0].order.id
    }

    async fn deliver(&self, order_id: i64) {
        for next in [
            OrderStatus::Confirmed,
            OrderStatus::Ready,
            OrderStatus::OutForDelivery,
            OrderStatus::Delivered,
        ] {
            self.state
                .state_machine
                .apply(order_id, &self.vendor(), next, None)
                .await
                .unwrap();
        }
    }
}

fn cart(lines: &[(i64, i32)]) -> CreateOrdersRequest {
    CreateOrdersRequest {
        items: lines
            .iter()
            .map(|&(product_id, quantity)| CartLine {
                product_id,
                quantity,
            })
            .collect(),
        ..Default::default()
    }
}

macro_rules! fixture_or_skip {
    () => {
        match PgFixture::connect().await {
            Some(fixture) => fixture,
            None => {
                eprintln!("DATABASE_URL not set, skipping");
                return;
            }
        }
    };
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_pg_concurrent_reservations_never_oversell() {
    let fx = fixture_or_skip!();
    let product_id = fx.product(Decimal::new(450, 2), 7).await;

    let tasks: Vec<_> = (0..12)
        .map(|_| {
            let ledger = fx.state.ledger.clone();
            tokio::spawn(async move { ledger.reserve(product_id, 2).await })
        })
        .collect();

    let mut accepted = 0;
    let mut rejected = 0;
    for result in futures::future::join_all(tasks).await {
        match result.unwrap() {
            Ok(()) => accepted += 1,
            Err(LedgerError::InsufficientStock { .. }) => rejected += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(accepted, 3);
    assert_eq!(rejected, 9);
    assert_eq!(fx.stock(product_id).await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_pg_opposite_cart_orders_do_not_deadlock() {
    let fx = Arc::new(fixture_or_skip!());
    let first = fx.product(Decimal::new(100, 2), 100).await;
    let second = fx.product(Decimal::new(200, 2), 100).await;

    let tasks: Vec<_> = (0..12)
        .map(|i| {
            let fx = fx.clone();
            let lines = if i % 2 == 0 {
                vec![(first, 1), (second, 1)]
            } else {
                vec![(second, 1), (first, 1)]
            };
            tokio::spawn(async move {
                fx.state
                    .orchestrator
                    .checkout(fx.buyer_id, &cart(&lines))
                    .await
            })
        })
        .collect();

    for result in futures::future::join_all(tasks).await {
        let response = result.unwrap().unwrap();
        assert!(response.failures.is_empty(), "{:?}", response.failures);
        assert_eq!(response.orders.len(), 1);
        assert_eq!(response.orders[0].order.total_amount, Decimal::new(300, 2));
    }

    assert_eq!(fx.stock(first).await, 88);
    assert_eq!(fx.stock(second).await, 88);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_pg_concurrent_transitions_apply_once() {
    let fx = fixture_or_skip!();
    let product_id = fx.product(Decimal::new(500, 2), 10).await;
    let order_id = fx.checkout(&[(product_id, 3)]).await;

    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let machine = fx.state.state_machine.clone();
            let vendor = fx.vendor();
            let to = if i % 2 == 0 {
                OrderStatus::Confirmed
            } else {
                OrderStatus::Cancelled
            };
            tokio::spawn(async move { machine.apply(order_id, &vendor, to, None).await })
        })
        .collect();

    let mut applied = Vec::new();
    for result in futures::future::join_all(tasks).await {
        match result.unwrap() {
            Ok(detail) => applied.push(detail.order.status),
            Err(OrderError::InvalidTransition { .. } | OrderError::AlreadyFinalized { .. }) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!(applied.len(), 1);

    let detail = fx.state.orders.get(order_id, &fx.vendor()).await.unwrap();
    assert_eq!(detail.order.status, applied[0]);
    assert_eq!(detail.history.len(), 2);

    let expected_stock = match applied[0] {
        OrderStatus::Cancelled => 10,
        _ => 7,
    };
    assert_eq!(fx.stock(product_id).await, expected_stock);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_pg_concurrent_duplicate_ratings_store_one() {
    let fx = fixture_or_skip!();
    let product_id = fx.product(Decimal::new(500, 2), 10).await;
    let order_id = fx.checkout(&[(product_id, 1)]).await;
    fx.deliver(order_id).await;

    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let ratings = fx.state.ratings.clone();
            let buyer = Principal::buyer(fx.buyer_id);
            let req = CreateRatingRequest {
                order_id,
                direction: RatingDirection::BuyerToVendor,
                stars: i % 5 + 1,
                review: None,
                criteria: Default::default(),
            };
            tokio::spawn(async move { ratings.create_rating(&buyer, &req).await })
        })
        .collect();

    let mut created = Vec::new();
    let mut duplicates = 0;
    for result in futures::future::join_all(tasks).await {
        match result.unwrap() {
            Ok(rating) => created.push(rating),
            Err(RatingError::Duplicate { .. }) => duplicates += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!(created.len(), 1);
    assert_eq!(duplicates, 7);

    let stored = fx
        .state
        .ratings
        .ratings_for_business(fx.vendor_id)
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, created[0].id);
    assert_eq!(stored[0].stars, created[0].stars);

    let score = fx
        .state
        .ratings
        .aggregator()
        .score(RatingDirection::BuyerToVendor, fx.vendor_id)
        .await
        .unwrap();
    assert_eq!(score.total_ratings, 1);
    assert_eq!(score.average_stars, Decimal::from(created[0].stars));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_pg_ratee_lock_does_not_wait_on_open_checkout() {
    let fx = fixture_or_skip!();
    let product_id = fx.product(Decimal::new(500, 2), 10).await;

    // An uncommitted order references the vendor row
    let now = now_millis();
    let order = Order {
        id: snowflake_id(),
        buyer_id: fx.buyer_id,
        vendor_id: fx.vendor_id,
        total_amount: Decimal::new(500, 2),
        status: OrderStatus::Pending,
        delivery_method: DeliveryMethod::Pickup,
        payment_status: PaymentStatus::Pending,
        contact_name: None,
        contact_phone: None,
        delivery_address: None,
        notes: None,
        created_at: now,
        updated_at: now,
    };
    let item = OrderItem {
        id: snowflake_id(),
        order_id: order.id,
        product_id,
        quantity: 1,
        price_at_purchase: Decimal::new(500, 2),
    };
    let mut checkout_tx = fx.store.begin().await.unwrap();
    checkout_tx.insert_order(&order, &[item]).await.unwrap();

    let mut rating_tx = fx.store.begin().await.unwrap();
    let locked = tokio::time::timeout(
        Duration::from_secs(2),
        rating_tx.lock_ratee(RatingDirection::BuyerToVendor, fx.vendor_id),
    )
    .await
    .expect("ratee lock waited on the open checkout")
    .unwrap();
    assert!(locked);

    drop(rating_tx);
    drop(checkout_tx);
}
