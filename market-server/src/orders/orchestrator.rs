//! Multi-vendor checkout
//!
//! A cart is normalised, split by the vendor owning each product, and every
//! vendor group becomes one order in a unit of work of its own:
//!
//! ```text
//! cart ──normalise──► lines ──group by vendor──► [group A] [group B] ...
//!                                                    │
//!                     begin ─► read products ─► insert order + items + history
//!                           ─► reserve every line ─► commit ─► notify
//! ```
//!
//! Groups are independent: a failing group is reported and the others still
//! go through. Nothing of a failing group is persisted.

use rust_decimal::{Decimal, RoundingStrategy};
use shared::error::{AppError, ErrorCategory};
use shared::models::{
    DeliveryMethod, Order, OrderDetail, OrderItem, OrderStatus, PaymentStatus, Product,
    StatusChange,
};
use shared::request::{CartLine, CreateOrdersRequest};
use shared::response::{CheckoutResponse, VendorFailure};
use shared::util::{now_millis, snowflake_id};
use std::collections::HashMap;
use std::sync::Arc;

use super::error::{OrderError, OrderResult};
use crate::audit_log;
use crate::db::MarketStore;
use crate::inventory::{InventoryLedger, LedgerError};
use crate::notify::{self, Notification, Notifier};
use crate::utils::validation::{
    MAX_ADDRESS_LEN, MAX_CART_LINES, MAX_LINE_QUANTITY, MAX_NAME_LEN, MAX_NOTE_LEN,
    MAX_PHONE_LEN, normalize_optional, validate_optional_text,
};

/// Cart lines of one vendor, in cart order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorGroup {
    pub vendor_id: i64,
    pub lines: Vec<CartLine>,
}

impl VendorGroup {
    pub fn product_ids(&self) -> Vec<i64> {
        self.lines.iter().map(|l| l.product_id).collect()
    }
}

/// Contact and delivery data copied onto every order of a checkout
#[derive(Debug, Clone, Default)]
struct OrderMeta {
    delivery_method: DeliveryMethod,
    contact_name: Option<String>,
    contact_phone: Option<String>,
    delivery_address: Option<String>,
    notes: Option<String>,
}

impl OrderMeta {
    fn from_request(req: &CreateOrdersRequest) -> OrderResult<Self> {
        validate_optional_text(&req.contact_name, "contact_name", MAX_NAME_LEN)
            .and_then(|_| validate_optional_text(&req.contact_phone, "contact_phone", MAX_PHONE_LEN))
            .and_then(|_| {
                validate_optional_text(&req.delivery_address, "delivery_address", MAX_ADDRESS_LEN)
            })
            .and_then(|_| validate_optional_text(&req.notes, "notes", MAX_NOTE_LEN))
            .map_err(OrderError::Validation)?;

        let meta = Self {
            delivery_method: req.delivery_method,
            contact_name: normalize_optional(&req.contact_name),
            contact_phone: normalize_optional(&req.contact_phone),
            delivery_address: normalize_optional(&req.delivery_address),
            notes: normalize_optional(&req.notes),
        };

        if meta.delivery_method == DeliveryMethod::Delivery && meta.delivery_address.is_none() {
            return Err(OrderError::Validation(
                AppError::validation("delivery_address is required for delivery orders")
                    .with_detail("field", "delivery_address"),
            ));
        }

        Ok(meta)
    }
}

/// Merge duplicate product lines and check quantities and cart size
pub fn normalize_cart(lines: &[CartLine]) -> OrderResult<Vec<CartLine>> {
    if lines.is_empty() {
        return Err(OrderError::EmptyCart);
    }

    let mut merged: Vec<CartLine> = Vec::new();
    let mut index: HashMap<i64, usize> = HashMap::new();

    for line in lines {
        if !(1..=MAX_LINE_QUANTITY).contains(&line.quantity) {
            return Err(OrderError::InvalidQuantity {
                product_id: line.product_id,
                quantity: line.quantity,
            });
        }
        match index.get(&line.product_id) {
            Some(&i) => {
                let total = merged[i].quantity.saturating_add(line.quantity);
                if total > MAX_LINE_QUANTITY {
                    return Err(OrderError::InvalidQuantity {
                        product_id: line.product_id,
                        quantity: total,
                    });
                }
                merged[i].quantity = total;
            }
            None => {
                index.insert(line.product_id, merged.len());
                merged.push(line.clone());
            }
        }
    }

    if merged.len() > MAX_CART_LINES {
        return Err(OrderError::TooManyLines {
            count: merged.len(),
            max: MAX_CART_LINES,
        });
    }

    Ok(merged)
}

/// Split lines by owning vendor. Vendors keep the order of their first line.
///
/// Every line's product must be present in `products`.
pub fn group_by_vendor(lines: &[CartLine], products: &HashMap<i64, Product>) -> Vec<VendorGroup> {
    let mut groups: Vec<VendorGroup> = Vec::new();
    for line in lines {
        let Some(product) = products.get(&line.product_id) else {
            continue;
        };
        match groups.iter_mut().find(|g| g.vendor_id == product.vendor_id) {
            Some(group) => group.lines.push(line.clone()),
            None => groups.push(VendorGroup {
                vendor_id: product.vendor_id,
                lines: vec![line.clone()],
            }),
        }
    }
    groups
}

/// Round a money amount to cents, half away from zero
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Turns carts into per-vendor orders
#[derive(Clone)]
pub struct OrderOrchestrator {
    store: Arc<dyn MarketStore>,
    ledger: InventoryLedger,
    notifier: Arc<dyn Notifier>,
}

impl OrderOrchestrator {
    pub fn new(
        store: Arc<dyn MarketStore>,
        ledger: InventoryLedger,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            ledger,
            notifier,
        }
    }

    /// Create one pending order per vendor in the cart.
    ///
    /// Fails as a whole only for problems with the cart itself (empty,
    /// invalid quantities, unknown products, unknown buyer). Per-vendor
    /// problems are reported in [`CheckoutResponse::failures`].
    pub async fn checkout(
        &self,
        buyer_id: i64,
        req: &CreateOrdersRequest,
    ) -> OrderResult<CheckoutResponse> {
        let meta = OrderMeta::from_request(req)?;
        let lines = normalize_cart(&req.items)?;
        let product_ids: Vec<i64> = lines.iter().map(|l| l.product_id).collect();

        let products = {
            let mut tx = self.store.begin().await?;
            if !tx.consumer_exists(buyer_id).await? {
                return Err(OrderError::ConsumerNotFound(buyer_id));
            }
            let found: HashMap<i64, Product> = tx
                .get_products(&product_ids)
                .await?
                .into_iter()
                .map(|p| (p.id, p))
                .collect();
            found
        };

        let missing: Vec<i64> = product_ids
            .iter()
            .copied()
            .filter(|id| !products.contains_key(id))
            .collect();
        if !missing.is_empty() {
            return Err(OrderError::ProductsNotFound(missing));
        }

        let groups = group_by_vendor(&lines, &products);
        tracing::info!(
            buyer_id,
            lines = lines.len(),
            vendors = groups.len(),
            "Checkout started"
        );

        let mut response = CheckoutResponse::default();
        for group in groups {
            match self.create_vendor_order(buyer_id, &group, &meta).await {
                Ok(detail) => response.orders.push(detail),
                Err(e) => {
                    let mut err: AppError = e.into();
                    if err.category() == ErrorCategory::Internal {
                        err = AppError::new(err.code);
                    }
                    tracing::warn!(
                        buyer_id,
                        vendor_id = group.vendor_id,
                        code = %err.code,
                        "Vendor order failed"
                    );
                    response.failures.push(VendorFailure::from_error(
                        group.vendor_id,
                        group.product_ids(),
                        &err,
                    ));
                }
            }
        }

        Ok(response)
    }

    async fn create_vendor_order(
        &self,
        buyer_id: i64,
        group: &VendorGroup,
        meta: &OrderMeta,
    ) -> OrderResult<OrderDetail> {
        let mut tx = self.store.begin().await?;

        let ids = group.product_ids();
        let products: HashMap<i64, Product> = tx
            .get_products(&ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let now = now_millis();
        let order_id = snowflake_id();
        let mut items = Vec::with_capacity(group.lines.len());

        for line in &group.lines {
            let product = products
                .get(&line.product_id)
                .filter(|p| p.vendor_id == group.vendor_id)
                .ok_or_else(|| OrderError::ProductsNotFound(vec![line.product_id]))?;

            // Early check on the snapshot; the reservation below re-checks atomically
            if line.quantity > product.quantity {
                return Err(LedgerError::InsufficientStock {
                    product_id: product.id,
                    requested: line.quantity,
                    available: product.quantity,
                }
                .into());
            }

            items.push(OrderItem {
                id: snowflake_id(),
                order_id,
                product_id: product.id,
                quantity: line.quantity,
                price_at_purchase: product.price,
            });
        }

        let total_amount = round_money(items.iter().map(OrderItem::line_total).sum());
        let order = Order {
            id: order_id,
            buyer_id,
            vendor_id: group.vendor_id,
            total_amount,
            status: OrderStatus::Pending,
            delivery_method: meta.delivery_method,
            payment_status: PaymentStatus::Pending,
            contact_name: meta.contact_name.clone(),
            contact_phone: meta.contact_phone.clone(),
            delivery_address: meta.delivery_address.clone(),
            notes: meta.notes.clone(),
            created_at: now,
            updated_at: now,
        };
        let created = StatusChange {
            id: snowflake_id(),
            order_id,
            from_status: None,
            to_status: OrderStatus::Pending,
            actor_id: buyer_id,
            reason: None,
            created_at: now,
        };

        tx.insert_order(&order, &items).await?;
        tx.append_status_change(&created).await?;
        self.ledger.reserve_items_in(tx.as_mut(), &items).await?;
        tx.commit().await?;

        tracing::info!(
            order_id,
            buyer_id,
            vendor_id = group.vendor_id,
            total = %total_amount,
            items = items.len(),
            "Order created"
        );
        audit_log!(buyer_id, "create_order", format!("order:{order_id}"));
        notify::dispatch(&self.notifier, Notification::OrderCreated(order.clone()));

        Ok(OrderDetail {
            order,
            items,
            history: vec![created],
        })
    }
}
