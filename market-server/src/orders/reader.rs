//! Order reads scoped to the caller

use shared::models::{Order, OrderDetail};
use shared::request::OrderListQuery;
use std::sync::Arc;

use super::error::{OrderError, OrderResult};
use crate::auth::{Principal, Role};
use crate::db::{MarketStore, OrderFilter};

/// Buyer of the order, vendor owning it, or system
pub fn can_view(order: &Order, principal: &Principal) -> bool {
    match principal.role {
        Role::Buyer => order.is_buyer(principal.user_id),
        Role::Vendor { business_id } => order.is_vendor(business_id),
        Role::System => true,
    }
}

#[derive(Clone)]
pub struct OrderReader {
    store: Arc<dyn MarketStore>,
}

impl OrderReader {
    pub fn new(store: Arc<dyn MarketStore>) -> Self {
        Self { store }
    }

    /// Order with items and status history
    pub async fn get(&self, order_id: i64, principal: &Principal) -> OrderResult<OrderDetail> {
        let mut tx = self.store.begin().await?;
        let order = tx
            .get_order(order_id)
            .await?
            .ok_or(OrderError::OrderNotFound(order_id))?;

        if !can_view(&order, principal) {
            return Err(OrderError::PermissionDenied(format!(
                "order {order_id} does not belong to the caller"
            )));
        }

        let items = tx.get_order_items(order_id).await?;
        let history = tx.status_history(order_id).await?;
        Ok(OrderDetail {
            order,
            items,
            history,
        })
    }

    /// Orders visible to the caller, newest first
    pub async fn list(&self, principal: &Principal, query: &OrderListQuery) -> OrderResult<Vec<Order>> {
        let mut filter = OrderFilter {
            status: query.status,
            limit: query.limit(),
            offset: query.offset(),
            ..Default::default()
        };
        match principal.role {
            Role::Buyer => filter.buyer_id = Some(principal.user_id),
            Role::Vendor { business_id } => filter.vendor_id = Some(business_id),
            Role::System => {}
        }

        let mut tx = self.store.begin().await?;
        Ok(tx.list_orders(&filter).await?)
    }
}
