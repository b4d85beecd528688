//! Order status state machine
//!
//! ```text
//! pending ──► confirmed ──► ready ──► out_for_delivery ──► delivered
//!    │            │           │              │
//!    └────────────┴───────────┴──────────────┴──────────► cancelled
//! ```
//!
//! `delivered` and `cancelled` are terminal. The table below is the only
//! place transitions are defined. Applying one is a compare-and-set on the
//! status the caller read, so two concurrent transitions that assumed the
//! same starting status cannot both win.

use shared::models::{Order, OrderDetail, OrderStatus, StatusChange};
use shared::util::{now_millis, snowflake_id};
use std::sync::Arc;

use super::error::{OrderError, OrderResult};
use crate::audit_log;
use crate::auth::{Principal, Role};
use crate::db::MarketStore;
use crate::inventory::InventoryLedger;
use crate::notify::{self, Notification, Notifier};
use crate::utils::validation::{MAX_NOTE_LEN, normalize_optional, validate_optional_text};

/// Statuses reachable from `from` in one step
pub const fn next_statuses(from: OrderStatus) -> &'static [OrderStatus] {
    use OrderStatus::*;
    match from {
        Pending => &[Confirmed, Cancelled],
        Confirmed => &[Ready, Cancelled],
        Ready => &[OutForDelivery, Cancelled],
        OutForDelivery => &[Delivered, Cancelled],
        Delivered | Cancelled => &[],
    }
}

pub fn is_allowed(from: OrderStatus, to: OrderStatus) -> bool {
    next_statuses(from).contains(&to)
}

/// Whether the transition gives reserved stock back
pub fn releases_stock(to: OrderStatus) -> bool {
    to == OrderStatus::Cancelled
}

/// Check `actor` may move `order` to `to`, without touching storage.
///
/// Checks run in this order: relationship to the order, terminal status,
/// transition table, role permission for the transition.
pub fn check_transition(order: &Order, actor: &Principal, to: OrderStatus) -> OrderResult<()> {
    let related = match actor.role {
        Role::Vendor { business_id } => order.is_vendor(business_id),
        Role::Buyer => order.is_buyer(actor.user_id),
        Role::System => true,
    };
    if !related {
        return Err(OrderError::PermissionDenied(format!(
            "order {} does not belong to the caller",
            order.id
        )));
    }

    if order.status.is_terminal() {
        return Err(OrderError::AlreadyFinalized {
            order_id: order.id,
            status: order.status,
        });
    }

    if !is_allowed(order.status, to) {
        return Err(OrderError::InvalidTransition {
            from: order.status,
            to,
            reason: None,
        });
    }

    match actor.role {
        Role::Vendor { .. } => Ok(()),
        Role::Buyer if to == OrderStatus::Cancelled && order.status == OrderStatus::Pending => {
            Ok(())
        }
        Role::Buyer => Err(OrderError::PermissionDenied(
            "buyers may only cancel pending orders".to_string(),
        )),
        Role::System if to == OrderStatus::Cancelled => Ok(()),
        Role::System => Err(OrderError::PermissionDenied(
            "system callers may only cancel orders".to_string(),
        )),
    }
}

/// Applies status transitions
#[derive(Clone)]
pub struct OrderStateMachine {
    store: Arc<dyn MarketStore>,
    ledger: InventoryLedger,
    notifier: Arc<dyn Notifier>,
}

impl OrderStateMachine {
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

    /// Move an order to `to`. Cancellation releases every item's quantity.
    pub async fn apply(
        &self,
        order_id: i64,
        actor: &Principal,
        to: OrderStatus,
        reason: Option<String>,
    ) -> OrderResult<OrderDetail> {
        validate_optional_text(&reason, "reason", MAX_NOTE_LEN).map_err(OrderError::Validation)?;
        let reason = normalize_optional(&reason);

        let mut tx = self.store.begin().await?;

        let order = tx
            .get_order(order_id)
            .await?
            .ok_or(OrderError::OrderNotFound(order_id))?;
        check_transition(&order, actor, to)?;

        let from = order.status;
        let now = now_millis();
        if !tx.compare_and_set_status(order_id, from, to, now).await? {
            // Someone else moved the order after we read it
            let current = tx
                .get_order(order_id)
                .await?
                .ok_or(OrderError::OrderNotFound(order_id))?;
            tracing::info!(order_id, expected = %from, actual = %current.status, "Status changed concurrently");
            return Err(if current.status.is_terminal() {
                OrderError::AlreadyFinalized {
                    order_id,
                    status: current.status,
                }
            } else {
                OrderError::InvalidTransition {
                    from: current.status,
                    to,
                    reason: Some("order status changed concurrently"),
                }
            });
        }

        let items = tx.get_order_items(order_id).await?;
        if releases_stock(to) {
            self.ledger.release_items_in(tx.as_mut(), &items).await?;
        }

        tx.append_status_change(&StatusChange {
            id: snowflake_id(),
            order_id,
            from_status: Some(from),
            to_status: to,
            actor_id: actor.user_id,
            reason: reason.clone(),
            created_at: now,
        })
        .await?;

        let history = tx.status_history(order_id).await?;
        tx.commit().await?;

        let order = Order {
            status: to,
            updated_at: now,
            ..order
        };

        tracing::info!(order_id, from = %from, to = %to, actor = actor.user_id, "Order status changed");
        audit_log!(
            actor.user_id,
            "order_transition",
            format!("order:{order_id}"),
            format!("{from} -> {to}")
        );
        notify::dispatch(
            &self.notifier,
            Notification::OrderStatusChanged {
                order: order.clone(),
                from,
                reason,
            },
        );

        Ok(OrderDetail {
            order,
            items,
            history,
        })
    }
}
