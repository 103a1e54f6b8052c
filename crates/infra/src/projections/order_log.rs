//! Audit log of order workflow steps.
//!
//! Entries are derived from order events, so a transition and its log entry
//! are committed by the same append. There is no update or delete path.

use serde_json::Value as JsonValue;

use stocklink_core::Actor;
use stocklink_events::{Event, EventEnvelope};
use stocklink_transfers::{AGGREGATE_TYPE, OrderLogEntry, TransferOrderEvent, TransferOrderId};

use super::{Cursors, Projection, ProjectionError, decode};
use crate::read_model::ReadStore;

#[derive(Debug)]
pub struct OrderLogProjection<S>
where
    S: ReadStore<TransferOrderId, Vec<OrderLogEntry>>,
{
    store: S,
    cursors: Cursors,
}

impl<S> OrderLogProjection<S>
where
    S: ReadStore<TransferOrderId, Vec<OrderLogEntry>>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: Cursors::default(),
        }
    }

    /// Entries for one order, newest first.
    pub fn entries(&self, order_id: TransferOrderId) -> Vec<OrderLogEntry> {
        let mut entries = self.store.get(&order_id).unwrap_or_default();
        entries.reverse();
        entries
    }

    fn record(&self, order_id: TransferOrderId, user: Option<Actor>, action: String, ev: &TransferOrderEvent) {
        let mut entries = self.store.get(&order_id).unwrap_or_default();
        entries.push(OrderLogEntry {
            order_id,
            user,
            action,
            created_at: ev.occurred_at(),
        });
        self.store.upsert(order_id, entries);
    }
}

impl<S> Projection for OrderLogProjection<S>
where
    S: ReadStore<TransferOrderId, Vec<OrderLogEntry>>,
{
    fn name(&self) -> &'static str {
        "transfers.order_log"
    }

    fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        if envelope.aggregate_type() != AGGREGATE_TYPE {
            return Ok(());
        }
        if !self.cursors.should_apply(envelope)? {
            return Ok(());
        }

        let ev: TransferOrderEvent = decode(envelope)?;
        if let Some(action) = ev.audit_action() {
            self.record(ev.order_id(), ev.actor().cloned(), action, &ev);
        }

        self.cursors.advance(envelope);
        Ok(())
    }

    fn clear(&self) {
        self.store.clear();
        self.cursors.clear();
    }
}
