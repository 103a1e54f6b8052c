//! Read-side shapes of a transfer order, shared by the API and reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stocklink_catalog::ProductId;
use stocklink_core::{Actor, UserId};

use crate::order::{ItemId, OrderItem, TransferOrderId};
use crate::status::{Branch, OrderStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineView {
    pub item_id: ItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub qty_requested: u32,
    pub qty_sent: u32,
    pub missing_qty: u32,
    pub is_fulfilled: bool,
    pub note: String,
}

impl From<&OrderItem> for OrderLineView {
    fn from(item: &OrderItem) -> Self {
        Self {
            item_id: item.item_id,
            product_id: item.product_id,
            product_name: item.product_name.clone(),
            qty_requested: item.qty_requested,
            qty_sent: item.qty_sent,
            missing_qty: item.missing_qty(),
            is_fulfilled: item.is_fulfilled(),
            note: item.note.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderView {
    pub order_id: TransferOrderId,
    pub from_branch: Branch,
    pub to_branch: Branch,
    pub status: OrderStatus,
    pub status_display: String,
    pub created_by: Actor,
    pub created_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub picking_at: Option<DateTime<Utc>>,
    pub picking_by: Option<Actor>,
    pub dispatched_at: Option<DateTime<Utc>>,
    pub received_at: Option<DateTime<Utc>>,
    pub notes_from_austin: String,
    pub items: Vec<OrderLineView>,
}

impl OrderView {
    pub fn is_created_by(&self, user_id: UserId) -> bool {
        self.created_by.user_id == user_id
    }

    pub fn set_status(&mut self, status: OrderStatus) {
        self.status = status;
        self.status_display = status.label().to_string();
    }

    pub fn item_mut(&mut self, item_id: ItemId) -> Option<&mut OrderLineView> {
        self.items.iter_mut().find(|i| i.item_id == item_id)
    }
}

impl OrderLineView {
    /// Update sent quantity and the fields derived from it.
    pub fn set_sent(&mut self, qty_sent: u32) {
        self.qty_sent = qty_sent;
        self.missing_qty = self.qty_requested.saturating_sub(qty_sent);
        self.is_fulfilled = qty_sent >= self.qty_requested;
    }
}

/// One audit log row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLogEntry {
    pub order_id: TransferOrderId,
    pub user: Option<Actor>,
    pub action: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use stocklink_core::AggregateId;

    #[test]
    fn set_sent_recomputes_derived_fields() {
        let mut line = OrderLineView::from(&OrderItem {
            item_id: ItemId(1),
            product_id: ProductId::new(AggregateId::new()),
            product_name: "Feijão".to_string(),
            qty_requested: 4,
            qty_sent: 0,
            note: String::new(),
        });
        assert_eq!(line.missing_qty, 4);

        line.set_sent(3);
        assert_eq!(line.missing_qty, 1);
        assert!(!line.is_fulfilled);

        line.set_sent(6);
        assert_eq!(line.missing_qty, 0);
        assert!(line.is_fulfilled);
    }
}
