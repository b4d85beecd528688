//! Notification collaborator
//!
//! Delivery (push, e-mail, SMS) belongs to an external service. The core
//! only announces events through a [`Notifier`], after the unit of work that
//! produced them has committed. Calls are fire-and-forget: a failing
//! notifier is logged and never affects the request.

use async_trait::async_trait;
use shared::models::{Order, OrderStatus, Rating};
use std::sync::Arc;

/// Receiver of domain events
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    async fn order_created(&self, order: &Order) -> anyhow::Result<()>;

    async fn order_status_changed(
        &self,
        order: &Order,
        from: OrderStatus,
        reason: Option<&str>,
    ) -> anyhow::Result<()>;

    async fn rating_received(&self, rating: &Rating) -> anyhow::Result<()>;
}

/// Writes events to the application log
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn order_created(&self, order: &Order) -> anyhow::Result<()> {
        tracing::info!(
            order_id = order.id,
            buyer_id = order.buyer_id,
            vendor_id = order.vendor_id,
            total = %order.total_amount,
            "Order created"
        );
        Ok(())
    }

    async fn order_status_changed(
        &self,
        order: &Order,
        from: OrderStatus,
        reason: Option<&str>,
    ) -> anyhow::Result<()> {
        tracing::info!(
            order_id = order.id,
            from = %from,
            to = %order.status,
            reason = reason.unwrap_or_default(),
            "Order status changed"
        );
        Ok(())
    }

    async fn rating_received(&self, rating: &Rating) -> anyhow::Result<()> {
        tracing::info!(
            rating_id = rating.id,
            order_id = rating.order_id,
            ratee_id = rating.ratee_id,
            direction = %rating.direction,
            stars = rating.stars,
            "Rating received"
        );
        Ok(())
    }
}

/// Event handed to [`dispatch`]
#[derive(Debug, Clone)]
pub enum Notification {
    OrderCreated(Order),
    OrderStatusChanged {
        order: Order,
        from: OrderStatus,
        reason: Option<String>,
    },
    RatingReceived(Rating),
}

impl Notification {
    fn kind(&self) -> &'static str {
        match self {
            Self::OrderCreated(_) => "order_created",
            Self::OrderStatusChanged { .. } => "order_status_changed",
            Self::RatingReceived(_) => "rating_received",
        }
    }
}

/// Deliver `event` on a background task
pub fn dispatch(notifier: &Arc<dyn Notifier>, event: Notification) {
    let notifier = notifier.clone();
    tokio::spawn(async move {
        let kind = event.kind();
        let result = match &event {
            Notification::OrderCreated(order) => notifier.order_created(order).await,
            Notification::OrderStatusChanged {
                order,
                from,
                reason,
            } => {
                notifier
                    .order_status_changed(order, *from, reason.as_deref())
                    .await
            }
            Notification::RatingReceived(rating) => notifier.rating_received(rating).await,
        };
        if let Err(e) = result {
            tracing::warn!(kind, error = %e, "Notification delivery failed");
        }
    });
}
