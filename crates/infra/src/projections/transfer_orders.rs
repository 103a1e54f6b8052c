use serde_json::Value as JsonValue;

use stocklink_events::EventEnvelope;
use stocklink_transfers::{
    AGGREGATE_TYPE, OrderLineView, OrderStatus, OrderView, TransferOrderEvent, TransferOrderId,
};

use super::{Cursors, Projection, ProjectionError, decode};
use crate::read_model::ReadStore;

/// Current state of every submitted order.
#[derive(Debug)]
pub struct TransferOrdersProjection<S>
where
    S: ReadStore<TransferOrderId, OrderView>,
{
    store: S,
    cursors: Cursors,
}

impl<S> TransferOrdersProjection<S>
where
    S: ReadStore<TransferOrderId, OrderView>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: Cursors::default(),
        }
    }

    pub fn get(&self, order_id: TransferOrderId) -> Option<OrderView> {
        self.store.get(&order_id)
    }

    /// All orders, newest first (ties broken by the higher order number).
    pub fn list(&self) -> Vec<OrderView> {
        let mut all = self.store.list();
        all.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.order_id.cmp(&a.order_id))
        });
        all
    }

    pub fn list_with_status(&self, statuses: &[OrderStatus]) -> Vec<OrderView> {
        self.list()
            .into_iter()
            .filter(|o| statuses.contains(&o.status))
            .collect()
    }

    pub fn count_with_status(&self, status: OrderStatus) -> usize {
        self.store.list().iter().filter(|o| o.status == status).count()
    }

    /// Highest order number currently in `status`.
    pub fn newest_with_status(&self, status: OrderStatus) -> Option<TransferOrderId> {
        self.store
            .list()
            .iter()
            .filter(|o| o.status == status)
            .map(|o| o.order_id)
            .max()
    }

    pub fn max_order_id(&self) -> Option<TransferOrderId> {
        self.store.list().iter().map(|o| o.order_id).max()
    }

    fn apply(&self, ev: TransferOrderEvent) -> Result<(), ProjectionError> {
        let order_id = ev.order_id();

        if let TransferOrderEvent::OrderSubmitted(e) = ev {
            self.store.upsert(
                order_id,
                OrderView {
                    order_id,
                    from_branch: e.from_branch,
                    to_branch: e.to_branch,
                    status: OrderStatus::Submitted,
                    status_display: OrderStatus::Submitted.label().to_string(),
                    created_by: e.created_by,
                    created_at: e.created_at,
                    submitted_at: Some(e.occurred_at),
                    picking_at: None,
                    picking_by: None,
                    dispatched_at: None,
                    received_at: None,
                    notes_from_austin: String::new(),
                    items: e.items.iter().map(OrderLineView::from).collect(),
                },
            );
            return Ok(());
        }

        let mut view = self
            .store
            .get(&order_id)
            .ok_or_else(|| ProjectionError::UnknownRecord(format!("order {order_id}")))?;

        match ev {
            TransferOrderEvent::OrderSubmitted(_) => {}
            TransferOrderEvent::PickingStarted(e) => {
                view.set_status(OrderStatus::Picking);
                view.picking_by = Some(e.actor);
                view.picking_at = Some(e.occurred_at);
            }
            TransferOrderEvent::SentQuantitiesSet(e) => {
                for q in e.quantities {
                    if let Some(line) = view.item_mut(q.item_id) {
                        line.set_sent(q.qty_sent);
                    }
                }
                if let Some(notes) = e.notes {
                    view.notes_from_austin = notes;
                }
            }
            TransferOrderEvent::ItemFulfilled(e) => {
                if let Some(line) = view.item_mut(e.item_id) {
                    line.set_sent(e.qty_sent);
                }
            }
            TransferOrderEvent::OrderDispatched(e) => {
                view.set_status(OrderStatus::Dispatched);
                view.dispatched_at = Some(e.occurred_at);
            }
            TransferOrderEvent::OrderReceived(e) => {
                view.set_status(OrderStatus::Received);
                view.received_at = Some(e.occurred_at);
            }
        }

        self.store.upsert(order_id, view);
        Ok(())
    }
}

impl<S> Projection for TransferOrdersProjection<S>
where
    S: ReadStore<TransferOrderId, OrderView>,
{
    fn name(&self) -> &'static str {
        "transfers.orders"
    }

    fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        if envelope.aggregate_type() != AGGREGATE_TYPE {
            return Ok(());
        }
        if !self.cursors.should_apply(envelope)? {
            return Ok(());
        }

        let ev: TransferOrderEvent = decode(envelope)?;
        if ev.order_id().aggregate_id() != envelope.aggregate_id() {
            return Err(ProjectionError::StreamMismatch(
                "event order_id does not match envelope aggregate_id".to_string(),
            ));
        }

        self.apply(ev)?;
        self.cursors.advance(envelope);
        Ok(())
    }

    fn clear(&self) {
        self.store.clear();
        self.cursors.clear();
    }
}
