//! End-to-end API tests against the in-memory store
//!
//! Every request goes through the full router (extractors, middleware,
//! error envelope), so these double as wire-format checks.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use market_server::ServerState;
use market_server::api;
use market_server::auth::{JwtConfig, JwtService, Principal};
use market_server::db::MemoryStore;
use market_server::notify::LogNotifier;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use shared::models::Product;
use tower::ServiceExt;

const VENDOR_A: i64 = 10;
const VENDOR_B: i64 = 20;
const BUYER: i64 = 100;

struct TestApp {
    store: MemoryStore,
    jwt: JwtService,
    router: Router,
}

impl TestApp {
    async fn new() -> Self {
        let store = MemoryStore::new();
        store.add_business(VENDOR_A).await;
        store.add_business(VENDOR_B).await;
        store.add_consumer(BUYER).await;

        let jwt = JwtService::with_config(JwtConfig::new("test-secret", "market-test"));
        let state = ServerState::build(
            Arc::new(store.clone()),
            jwt.clone(),
            2,
            Arc::new(LogNotifier),
        );
        let router = api::router(state, Duration::from_secs(10));

        Self { store, jwt, router }
    }

    async fn product(&self, id: i64, vendor_id: i64, price: Decimal, quantity: i32) {
        self.store
            .put_product(Product {
                id,
                vendor_id,
                name: format!("product-{id}"),
                price,
                quantity,
            })
            .await;
    }

    async fn stock(&self, product_id: i64) -> i32 {
        self.store.product(product_id).await.unwrap().quantity
    }

    fn token(&self, principal: Principal) -> String {
        self.jwt.issue(&principal).unwrap()
    }

    fn buyer(&self, user_id: i64) -> String {
        self.token(Principal::buyer(user_id))
    }

    fn vendor(&self, business_id: i64) -> String {
        self.token(Principal::vendor(business_id + 1000, business_id))
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn checkout(&self, buyer_token: &str, items: Value) -> (StatusCode, Value) {
        self.send(
            Method::POST,
            "/orders",
            Some(buyer_token),
            Some(json!({ "items": items })),
        )
        .await
    }

    async fn set_status(&self, token: &str, order_id: i64, status: &str) -> (StatusCode, Value) {
        self.send(
            Method::PATCH,
            &format!("/orders/{order_id}/status"),
            Some(token),
            Some(json!({ "status": status })),
        )
        .await
    }

    /// Single-vendor order walked through to `delivered`
    async fn delivered_order(&self, buyer_id: i64, vendor_id: i64, product_id: i64) -> i64 {
        let (status, body) = self
            .checkout(
                &self.buyer(buyer_id),
                json!([{ "product_id": product_id, "quantity": 1 }]),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        let order_id = body["orders"][0]["id"].as_i64().unwrap();

        let vendor = self.vendor(vendor_id);
        for next in ["confirmed", "ready", "out_for_delivery", "delivered"] {
            let (status, body) = self.set_status(&vendor, order_id, next).await;
            assert_eq!(status, StatusCode::OK, "{next}: {body}");
        }
        order_id
    }
}

fn error_code(body: &Value) -> &str {
    body["error"]["code"].as_str().unwrap_or_default()
}

// ========== Health and authentication ==========

#[tokio::test]
async fn test_health_is_public() {
    let app = TestApp::new().await;
    let (status, body) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_missing_token_is_401() {
    let app = TestApp::new().await;
    let (status, body) = app.send(Method::GET, "/orders", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "NotAuthenticated");
}

#[tokio::test]
async fn test_foreign_signature_is_401() {
    let app = TestApp::new().await;
    let other = JwtService::with_config(JwtConfig::new("another-secret", "market-test"));
    let token = other.issue(&Principal::buyer(BUYER)).unwrap();

    let (status, body) = app.send(Method::GET, "/orders", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "TokenInvalid");
}

#[tokio::test]
async fn test_vendor_cannot_checkout() {
    let app = TestApp::new().await;
    app.product(1, VENDOR_A, Decimal::new(10, 0), 5).await;

    let (status, body) = app
        .checkout(&app.vendor(VENDOR_A), json!([{ "product_id": 1, "quantity": 1 }]))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), "PermissionDenied");
    assert_eq!(app.stock(1).await, 5);
}

#[tokio::test]
async fn test_malformed_body_uses_error_envelope() {
    let app = TestApp::new().await;
    let (status, body) = app
        .send(
            Method::POST,
            "/orders",
            Some(&app.buyer(BUYER)),
            Some(json!({ "items": "not-a-list" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "InvalidRequest");
}

// ========== Checkout ==========

#[tokio::test]
async fn test_total_equals_sum_of_line_totals() {
    let app = TestApp::new().await;
    app.product(1, VENDOR_A, Decimal::new(250, 2), 10).await;
    app.product(2, VENDOR_A, Decimal::new(425, 2), 10).await;

    let (status, body) = app
        .checkout(
            &app.buyer(BUYER),
            json!([
                { "product_id": 1, "quantity": 3 },
                { "product_id": 2, "quantity": 1 }
            ]),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let order = &body["orders"][0];
    let items = order["items"].as_array().unwrap();
    let sum: f64 = items
        .iter()
        .map(|i| i["quantity"].as_f64().unwrap() * i["price_at_purchase"].as_f64().unwrap())
        .sum();
    assert_eq!(order["total_amount"].as_f64(), Some(11.75));
    assert_eq!(sum, 11.75);
    assert_eq!(order["status"], "pending");
    assert_eq!(order["history"].as_array().unwrap().len(), 1);

    assert_eq!(app.stock(1).await, 7);
    assert_eq!(app.stock(2).await, 9);
}

#[tokio::test]
async fn test_cart_splits_into_one_order_per_vendor() {
    let app = TestApp::new().await;
    app.product(1, VENDOR_A, Decimal::new(10, 0), 5).await;
    app.product(2, VENDOR_B, Decimal::new(5, 0), 5).await;

    let (status, body) = app
        .checkout(
            &app.buyer(BUYER),
            json!([
                { "product_id": 1, "quantity": 1 },
                { "product_id": 2, "quantity": 2 }
            ]),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let orders = body["orders"].as_array().unwrap();
    assert_eq!(orders.len(), 2);
    assert!(body["failures"].as_array().unwrap().is_empty());
    let mut vendors: Vec<i64> = orders
        .iter()
        .map(|o| o["vendor_id"].as_i64().unwrap())
        .collect();
    vendors.sort();
    assert_eq!(vendors, vec![VENDOR_A, VENDOR_B]);
    for order in orders {
        assert_eq!(order["total_amount"].as_f64(), Some(10.0));
        assert_eq!(order["buyer_id"].as_i64(), Some(BUYER));
        assert_eq!(order["items"].as_array().unwrap().len(), 1);
    }
}

#[tokio::test]
async fn test_partial_cart_creates_orders_for_vendors_with_stock() {
    let app = TestApp::new().await;
    app.product(1, VENDOR_A, Decimal::new(10, 0), 1).await;
    app.product(2, VENDOR_B, Decimal::new(5, 0), 5).await;

    let (status, body) = app
        .checkout(
            &app.buyer(BUYER),
            json!([
                { "product_id": 1, "quantity": 2 },
                { "product_id": 2, "quantity": 1 }
            ]),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let orders = body["orders"].as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["vendor_id"].as_i64(), Some(VENDOR_B));
    assert_eq!(orders[0]["total_amount"].as_f64(), Some(5.0));

    let failures = body["failures"].as_array().unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0]["vendor_id"].as_i64(), Some(VENDOR_A));
    assert_eq!(failures[0]["code"], "InsufficientStock");

    assert_eq!(app.stock(1).await, 1);
    assert_eq!(app.stock(2).await, 4);
    assert_eq!(app.store.order_count_for_vendor(VENDOR_A).await, 0);
}

#[tokio::test]
async fn test_all_vendors_failing_is_409_with_failures() {
    let app = TestApp::new().await;
    app.product(1, VENDOR_A, Decimal::new(10, 0), 1).await;

    let (status, body) = app
        .checkout(&app.buyer(BUYER), json!([{ "product_id": 1, "quantity": 2 }]))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "InsufficientStock");
    assert_eq!(body["error"]["details"]["failures"].as_array().unwrap().len(), 1);
    assert_eq!(app.stock(1).await, 1);
}

#[tokio::test]
async fn test_unknown_product_fails_whole_checkout() {
    let app = TestApp::new().await;
    app.product(1, VENDOR_A, Decimal::new(10, 0), 5).await;

    let (status, body) = app
        .checkout(
            &app.buyer(BUYER),
            json!([
                { "product_id": 1, "quantity": 1 },
                { "product_id": 999, "quantity": 1 }
            ]),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), "ProductNotFound");
    assert_eq!(app.stock(1).await, 5);
}

#[tokio::test]
async fn test_empty_cart_is_400() {
    let app = TestApp::new().await;
    let (status, body) = app.checkout(&app.buyer(BUYER), json!([])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "EmptyCart");
}

#[tokio::test]
async fn test_concurrent_checkouts_never_oversell() {
    let app = Arc::new(TestApp::new().await);
    app.product(1, VENDOR_A, Decimal::new(10, 0), 3).await;
    for buyer in 200..210 {
        app.store.add_consumer(buyer).await;
    }

    let tasks: Vec<_> = (200..210)
        .map(|buyer| {
            let app = app.clone();
            tokio::spawn(async move {
                let token = app.buyer(buyer);
                app.checkout(&token, json!([{ "product_id": 1, "quantity": 1 }]))
                    .await
                    .0
            })
        })
        .collect();

    let mut created = 0;
    let mut rejected = 0;
    for status in futures::future::join_all(tasks).await {
        match status.unwrap() {
            StatusCode::CREATED => created += 1,
            StatusCode::CONFLICT => rejected += 1,
            other => panic!("unexpected status {other}"),
        }
    }

    assert_eq!(created, 3);
    assert_eq!(rejected, 7);
    assert_eq!(app.stock(1).await, 0);
    assert_eq!(app.store.order_count_for_vendor(VENDOR_A).await, 3);
}

// ========== Reads ==========

#[tokio::test]
async fn test_order_visibility() {
    let app = TestApp::new().await;
    app.product(1, VENDOR_A, Decimal::new(10, 0), 5).await;
    app.store.add_consumer(101).await;

    let (_, body) = app
        .checkout(&app.buyer(BUYER), json!([{ "product_id": 1, "quantity": 1 }]))
        .await;
    let order_id = body["orders"][0]["id"].as_i64().unwrap();
    let uri = format!("/orders/{order_id}");

    let (status, _) = app.send(Method::GET, &uri, Some(&app.buyer(BUYER)), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.send(Method::GET, &uri, Some(&app.vendor(VENDOR_A)), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.send(Method::GET, &uri, Some(&app.buyer(101)), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.send(Method::GET, &uri, Some(&app.vendor(VENDOR_B)), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.send(Method::GET, "/orders/12345", Some(&app.buyer(BUYER)), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), "OrderNotFound");

    let (status, body) = app.send(Method::GET, "/orders", Some(&app.buyer(BUYER)), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    let (_, body) = app.send(Method::GET, "/orders", Some(&app.buyer(101)), None).await;
    assert!(body.as_array().unwrap().is_empty());
    let (_, body) = app
        .send(Method::GET, "/orders?status=confirmed", Some(&app.vendor(VENDOR_A)), None)
        .await;
    assert!(body.as_array().unwrap().is_empty());
}

// ========== Status transitions ==========

#[tokio::test]
async fn test_skipping_a_status_is_rejected() {
    let app = TestApp::new().await;
    app.product(1, VENDOR_A, Decimal::new(10, 0), 5).await;
    let (_, body) = app
        .checkout(&app.buyer(BUYER), json!([{ "product_id": 1, "quantity": 1 }]))
        .await;
    let order_id = body["orders"][0]["id"].as_i64().unwrap();

    let (status, body) = app.set_status(&app.vendor(VENDOR_A), order_id, "ready").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "InvalidTransition");

    let (_, body) = app
        .send(Method::GET, &format!("/orders/{order_id}"), Some(&app.buyer(BUYER)), None)
        .await;
    assert_eq!(body["status"], "pending");
    assert_eq!(body["history"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_cancel_after_confirm_releases_stock() {
    let app = TestApp::new().await;
    app.product(1, VENDOR_A, Decimal::new(10, 0), 5).await;
    let (_, body) = app
        .checkout(&app.buyer(BUYER), json!([{ "product_id": 1, "quantity": 3 }]))
        .await;
    let order_id = body["orders"][0]["id"].as_i64().unwrap();
    assert_eq!(app.stock(1).await, 2);

    let vendor = app.vendor(VENDOR_A);
    let (status, _) = app.set_status(&vendor, order_id, "confirmed").await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = app.set_status(&vendor, order_id, "cancelled").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "cancelled");
    assert_eq!(body["history"].as_array().unwrap().len(), 3);
    assert_eq!(app.stock(1).await, 5);

    let (status, body) = app.set_status(&vendor, order_id, "confirmed").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "OrderAlreadyFinalized");
    assert_eq!(app.stock(1).await, 5);
}

#[tokio::test]
async fn test_buyer_cancel_rules() {
    let app = TestApp::new().await;
    app.product(1, VENDOR_A, Decimal::new(10, 0), 5).await;
    let buyer = app.buyer(BUYER);

    let (_, body) = app.checkout(&buyer, json!([{ "product_id": 1, "quantity": 1 }])).await;
    let pending = body["orders"][0]["id"].as_i64().unwrap();
    let (status, _) = app.set_status(&buyer, pending, "confirmed").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.set_status(&buyer, pending, "cancelled").await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.checkout(&buyer, json!([{ "product_id": 1, "quantity": 1 }])).await;
    let confirmed = body["orders"][0]["id"].as_i64().unwrap();
    app.set_status(&app.vendor(VENDOR_A), confirmed, "confirmed").await;
    let (status, _) = app.set_status(&buyer, confirmed, "cancelled").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(app.stock(1).await, 4);
}

// ========== Ratings ==========

#[tokio::test]
async fn test_rating_requires_delivered_order() {
    let app = TestApp::new().await;
    app.product(1, VENDOR_A, Decimal::new(10, 0), 5).await;
    let (_, body) = app
        .checkout(&app.buyer(BUYER), json!([{ "product_id": 1, "quantity": 1 }]))
        .await;
    let order_id = body["orders"][0]["id"].as_i64().unwrap();

    let (status, body) = app
        .send(
            Method::POST,
            "/ratings",
            Some(&app.buyer(BUYER)),
            Some(json!({ "order_id": order_id, "direction": "buyer_to_vendor", "stars": 5 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "OrderNotDelivered");
}

#[tokio::test]
async fn test_rating_direction_must_match_rater() {
    let app = TestApp::new().await;
    app.product(1, VENDOR_A, Decimal::new(10, 0), 5).await;
    let order_id = app.delivered_order(BUYER, VENDOR_A, 1).await;

    let (status, body) = app
        .send(
            Method::POST,
            "/ratings",
            Some(&app.buyer(BUYER)),
            Some(json!({ "order_id": order_id, "direction": "vendor_to_buyer", "stars": 5 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "WrongRater");

    let (status, body) = app
        .send(
            Method::POST,
            "/ratings",
            Some(&app.buyer(BUYER)),
            Some(json!({ "order_id": order_id, "direction": "buyer_to_vendor", "stars": 6 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "InvalidRating");
}

#[tokio::test]
async fn test_concurrent_duplicate_ratings_store_one() {
    let app = Arc::new(TestApp::new().await);
    app.product(1, VENDOR_A, Decimal::new(10, 0), 5).await;
    let order_id = app.delivered_order(BUYER, VENDOR_A, 1).await;

    let submit = |stars: i32| {
        let app = app.clone();
        async move {
            let token = app.buyer(BUYER);
            app.send(
                Method::POST,
                "/ratings",
                Some(&token),
                Some(json!({ "order_id": order_id, "direction": "buyer_to_vendor", "stars": stars })),
            )
            .await
        }
    };

    let results = futures::future::join_all([submit(5), submit(1)]).await;
    let mut statuses: Vec<_> = results.iter().map(|(s, _)| *s).collect();
    statuses.sort();
    assert_eq!(statuses, vec![StatusCode::CREATED, StatusCode::CONFLICT]);

    let conflict = results.iter().find(|(s, _)| *s == StatusCode::CONFLICT).unwrap();
    assert_eq!(error_code(&conflict.1), "DuplicateRating");
    assert_eq!(app.store.rating_count_for_order(order_id).await, 1);

    let winner = &results.iter().find(|(s, _)| *s == StatusCode::CREATED).unwrap().1;
    let winning_stars = winner["stars"].as_i64().unwrap();

    // A later retry is rejected too and leaves the stored rating as it was
    let (status, _) = submit(3).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, ratings) = app
        .send(
            Method::GET,
            &format!("/businesses/{VENDOR_A}/ratings"),
            Some(&app.buyer(BUYER)),
            None,
        )
        .await;
    let ratings = ratings.as_array().unwrap();
    assert_eq!(ratings.len(), 1);
    assert_eq!(ratings[0]["id"], winner["id"]);
    assert_eq!(ratings[0]["stars"].as_i64(), Some(winning_stars));

    let (_, score) = app
        .send(
            Method::GET,
            &format!("/businesses/{VENDOR_A}/trust-score"),
            Some(&app.buyer(BUYER)),
            None,
        )
        .await;
    assert_eq!(score["total_ratings"].as_i64(), Some(1));
    assert_eq!(score["average_stars"].as_f64(), Some(winning_stars as f64));
}

#[tokio::test]
async fn test_vendor_trust_score_is_mean_of_ratings() {
    let app = TestApp::new().await;
    app.product(1, VENDOR_A, Decimal::new(10, 0), 10).await;
    app.store.add_consumer(101).await;

    let first = app.delivered_order(BUYER, VENDOR_A, 1).await;
    let second = app.delivered_order(101, VENDOR_A, 1).await;

    let (status, rating) = app
        .send(
            Method::POST,
            "/ratings",
            Some(&app.buyer(BUYER)),
            Some(json!({
                "order_id": first,
                "direction": "buyer_to_vendor",
                "stars": 5,
                "review": "Great honey",
                "criteria": { "quality": 5 }
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{rating}");
    assert_eq!(rating["rater_id"].as_i64(), Some(BUYER));
    assert_eq!(rating["ratee_id"].as_i64(), Some(VENDOR_A));

    let (status, _) = app
        .send(
            Method::POST,
            "/ratings",
            Some(&app.buyer(101)),
            Some(json!({
                "order_id": second,
                "direction": "buyer_to_vendor",
                "stars": 4,
                "criteria": { "quality": 4, "speed": 3 }
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, score) = app
        .send(
            Method::GET,
            &format!("/businesses/{VENDOR_A}/trust-score"),
            Some(&app.buyer(BUYER)),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(score["total_ratings"].as_i64(), Some(2));
    assert_eq!(score["average_stars"].as_f64(), Some(4.5));
    assert_eq!(score["criteria"]["quality"].as_f64(), Some(4.5));
    assert_eq!(score["criteria"]["speed"].as_f64(), Some(3.0));

    let (status, ratings) = app
        .send(
            Method::GET,
            &format!("/businesses/{VENDOR_A}/ratings"),
            Some(&app.buyer(BUYER)),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let ratings = ratings.as_array().unwrap();
    assert_eq!(ratings.len(), 2);
    assert_eq!(ratings[0]["stars"].as_i64(), Some(4));
}

#[tokio::test]
async fn test_consumer_trust_score_access() {
    let app = TestApp::new().await;
    app.product(1, VENDOR_A, Decimal::new(10, 0), 5).await;
    app.store.add_consumer(101).await;
    let order_id = app.delivered_order(BUYER, VENDOR_A, 1).await;

    let (status, _) = app
        .send(
            Method::POST,
            "/ratings",
            Some(&app.vendor(VENDOR_A)),
            Some(json!({ "order_id": order_id, "direction": "vendor_to_buyer", "stars": 3 })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let uri = format!("/consumers/{BUYER}/trust-score");
    let (status, score) = app.send(Method::GET, &uri, Some(&app.vendor(VENDOR_B)), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(score["average_stars"].as_f64(), Some(3.0));

    let (status, _) = app.send(Method::GET, &uri, Some(&app.buyer(BUYER)), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.send(Method::GET, &uri, Some(&app.buyer(101)), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .send(Method::GET, "/consumers/999/trust-score", Some(&app.vendor(VENDOR_A)), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), "ConsumerNotFound");

    let (_, score) = app
        .send(Method::GET, "/consumers/101/trust-score", Some(&app.vendor(VENDOR_A)), None)
        .await;
    assert_eq!(score["total_ratings"].as_i64(), Some(0));
}
