use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stocklink_catalog::ProductId;
use stocklink_core::{Actor, Aggregate, AggregateId, AggregateRoot, DomainError};
use stocklink_events::Event;

use crate::status::{Branch, OrderStatus, TransferAction};

/// Stream type used for transfer order envelopes.
pub const AGGREGATE_TYPE: &str = "transfers.order";

/// Transfer order number.
///
/// Sequential and human-facing ("Order #12"); the event stream key is derived
/// from it with [`AggregateId::from_sequence`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransferOrderId(pub u64);

impl TransferOrderId {
    pub fn aggregate_id(self) -> AggregateId {
        AggregateId::from_sequence(self.0)
    }

    pub fn from_aggregate_id(id: AggregateId) -> Option<Self> {
        id.as_sequence().map(Self)
    }
}

impl core::fmt::Display for TransferOrderId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Line number within an order. Assigned by the cart and never reused.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u32);

impl core::fmt::Display for ItemId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub item_id: ItemId,
    pub product_id: ProductId,
    /// Name at submission time, kept for display and reports.
    pub product_name: String,
    pub qty_requested: u32,
    pub qty_sent: u32,
    pub note: String,
}

impl OrderItem {
    pub fn missing_qty(&self) -> u32 {
        self.qty_requested.saturating_sub(self.qty_sent)
    }

    pub fn is_fulfilled(&self) -> bool {
        self.qty_sent >= self.qty_requested
    }
}

/// Aggregate root: TransferOrder.
///
/// Streams begin with [`OrderSubmitted`]; the draft phase lives in
/// [`crate::Cart`] and never reaches the event store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOrder {
    id: TransferOrderId,
    from_branch: Branch,
    to_branch: Branch,
    status: OrderStatus,
    created_by: Option<Actor>,
    created_at: Option<DateTime<Utc>>,
    submitted_at: Option<DateTime<Utc>>,
    picking_at: Option<DateTime<Utc>>,
    picking_by: Option<Actor>,
    dispatched_at: Option<DateTime<Utc>>,
    received_at: Option<DateTime<Utc>>,
    notes_from_austin: String,
    items: Vec<OrderItem>,
    version: u64,
    created: bool,
}

impl TransferOrder {
    /// Create an empty, not-yet-submitted aggregate instance for rehydration.
    pub fn empty(id: TransferOrderId) -> Self {
        Self {
            id,
            from_branch: Branch::Queimados,
            to_branch: Branch::Austin,
            status: OrderStatus::Draft,
            created_by: None,
            created_at: None,
            submitted_at: None,
            picking_at: None,
            picking_by: None,
            dispatched_at: None,
            received_at: None,
            notes_from_austin: String::new(),
            items: Vec::new(),
            version: 0,
            created: false,
        }
    }

    pub fn from_branch(&self) -> Branch {
        self.from_branch
    }

    pub fn to_branch(&self) -> Branch {
        self.to_branch
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn created_by(&self) -> Option<&Actor> {
        self.created_by.as_ref()
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn submitted_at(&self) -> Option<DateTime<Utc>> {
        self.submitted_at
    }

    pub fn picking_at(&self) -> Option<DateTime<Utc>> {
        self.picking_at
    }

    pub fn picking_by(&self) -> Option<&Actor> {
        self.picking_by.as_ref()
    }

    pub fn dispatched_at(&self) -> Option<DateTime<Utc>> {
        self.dispatched_at
    }

    pub fn received_at(&self) -> Option<DateTime<Utc>> {
        self.received_at
    }

    pub fn notes_from_austin(&self) -> &str {
        &self.notes_from_austin
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn item(&self, item_id: ItemId) -> Option<&OrderItem> {
        self.items.iter().find(|i| i.item_id == item_id)
    }
}

impl AggregateRoot for TransferOrder {
    type Id = TransferOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: SubmitOrder. Built by [`crate::Cart::checkout`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitOrder {
    pub order_id: TransferOrderId,
    pub from_branch: Branch,
    pub to_branch: Branch,
    pub created_by: Actor,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartPicking {
    pub order_id: TransferOrderId,
    pub actor: Actor,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SetSentQuantities.
///
/// Negative values are floored at zero; unknown item ids are ignored.
/// `notes: Some(_)` overwrites the supplier notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetSentQuantities {
    pub order_id: TransferOrderId,
    pub actor: Actor,
    pub quantities: BTreeMap<ItemId, i64>,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkItemFulfilled {
    pub order_id: TransferOrderId,
    pub actor: Actor,
    pub item_id: ItemId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dispatch {
    pub order_id: TransferOrderId,
    pub actor: Actor,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ConfirmReceipt. Only the order's creator may confirm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmReceipt {
    pub order_id: TransferOrderId,
    pub actor: Actor,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferOrderCommand {
    SubmitOrder(SubmitOrder),
    StartPicking(StartPicking),
    SetSentQuantities(SetSentQuantities),
    MarkItemFulfilled(MarkItemFulfilled),
    Dispatch(Dispatch),
    ConfirmReceipt(ConfirmReceipt),
}

impl TransferOrderCommand {
    pub fn order_id(&self) -> TransferOrderId {
        match self {
            TransferOrderCommand::SubmitOrder(c) => c.order_id,
            TransferOrderCommand::StartPicking(c) => c.order_id,
            TransferOrderCommand::SetSentQuantities(c) => c.order_id,
            TransferOrderCommand::MarkItemFulfilled(c) => c.order_id,
            TransferOrderCommand::Dispatch(c) => c.order_id,
            TransferOrderCommand::ConfirmReceipt(c) => c.order_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSubmitted {
    pub order_id: TransferOrderId,
    pub from_branch: Branch,
    pub to_branch: Branch,
    pub created_by: Actor,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickingStarted {
    pub order_id: TransferOrderId,
    pub actor: Actor,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentQuantity {
    pub item_id: ItemId,
    pub qty_sent: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentQuantitiesSet {
    pub order_id: TransferOrderId,
    pub actor: Actor,
    pub quantities: Vec<SentQuantity>,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFulfilled {
    pub order_id: TransferOrderId,
    pub actor: Actor,
    pub item_id: ItemId,
    pub product_name: String,
    pub qty_sent: u32,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDispatched {
    pub order_id: TransferOrderId,
    pub actor: Actor,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderReceived {
    pub order_id: TransferOrderId,
    pub actor: Actor,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferOrderEvent {
    OrderSubmitted(OrderSubmitted),
    PickingStarted(PickingStarted),
    SentQuantitiesSet(SentQuantitiesSet),
    ItemFulfilled(ItemFulfilled),
    OrderDispatched(OrderDispatched),
    OrderReceived(OrderReceived),
}

impl TransferOrderEvent {
    pub fn order_id(&self) -> TransferOrderId {
        match self {
            TransferOrderEvent::OrderSubmitted(e) => e.order_id,
            TransferOrderEvent::PickingStarted(e) => e.order_id,
            TransferOrderEvent::SentQuantitiesSet(e) => e.order_id,
            TransferOrderEvent::ItemFulfilled(e) => e.order_id,
            TransferOrderEvent::OrderDispatched(e) => e.order_id,
            TransferOrderEvent::OrderReceived(e) => e.order_id,
        }
    }

    /// Audit log text for this event, if it is logged.
    ///
    /// Sent-quantity edits are not logged.
    pub fn audit_action(&self) -> Option<String> {
        match self {
            TransferOrderEvent::OrderSubmitted(_) => Some("submitted".to_string()),
            TransferOrderEvent::PickingStarted(_) => Some("started picking".to_string()),
            TransferOrderEvent::SentQuantitiesSet(_) => None,
            TransferOrderEvent::ItemFulfilled(e) => Some(format!("marked OK for {}", e.product_name)),
            TransferOrderEvent::OrderDispatched(_) => Some("dispatched".to_string()),
            TransferOrderEvent::OrderReceived(_) => Some("confirmed receipt".to_string()),
        }
    }
}

impl Event for TransferOrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            TransferOrderEvent::OrderSubmitted(_) => "transfers.order.submitted",
            TransferOrderEvent::PickingStarted(_) => "transfers.order.picking_started",
            TransferOrderEvent::SentQuantitiesSet(_) => "transfers.order.sent_quantities_set",
            TransferOrderEvent::ItemFulfilled(_) => "transfers.order.item_fulfilled",
            TransferOrderEvent::OrderDispatched(_) => "transfers.order.dispatched",
            TransferOrderEvent::OrderReceived(_) => "transfers.order.received",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            TransferOrderEvent::OrderSubmitted(e) => e.occurred_at,
            TransferOrderEvent::PickingStarted(e) => e.occurred_at,
            TransferOrderEvent::SentQuantitiesSet(e) => e.occurred_at,
            TransferOrderEvent::ItemFulfilled(e) => e.occurred_at,
            TransferOrderEvent::OrderDispatched(e) => e.occurred_at,
            TransferOrderEvent::OrderReceived(e) => e.occurred_at,
        }
    }

    fn actor(&self) -> Option<&Actor> {
        match self {
            TransferOrderEvent::OrderSubmitted(e) => Some(&e.created_by),
            TransferOrderEvent::PickingStarted(e) => Some(&e.actor),
            TransferOrderEvent::SentQuantitiesSet(e) => Some(&e.actor),
            TransferOrderEvent::ItemFulfilled(e) => Some(&e.actor),
            TransferOrderEvent::OrderDispatched(e) => Some(&e.actor),
            TransferOrderEvent::OrderReceived(e) => Some(&e.actor),
        }
    }
}

impl Aggregate for TransferOrder {
    type Command = TransferOrderCommand;
    type Event = TransferOrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            TransferOrderEvent::OrderSubmitted(e) => {
                self.id = e.order_id;
                self.from_branch = e.from_branch;
                self.to_branch = e.to_branch;
                self.status = OrderStatus::Submitted;
                self.created_by = Some(e.created_by.clone());
                self.created_at = Some(e.created_at);
                self.submitted_at = Some(e.occurred_at);
                self.items = e.items.clone();
                self.created = true;
            }
            TransferOrderEvent::PickingStarted(e) => {
                self.status = OrderStatus::Picking;
                self.picking_by = Some(e.actor.clone());
                self.picking_at = Some(e.occurred_at);
            }
            TransferOrderEvent::SentQuantitiesSet(e) => {
                for q in &e.quantities {
                    if let Some(item) = self.items.iter_mut().find(|i| i.item_id == q.item_id) {
                        item.qty_sent = q.qty_sent;
                    }
                }
                if let Some(notes) = &e.notes {
                    self.notes_from_austin = notes.clone();
                }
            }
            TransferOrderEvent::ItemFulfilled(e) => {
                if let Some(item) = self.items.iter_mut().find(|i| i.item_id == e.item_id) {
                    item.qty_sent = e.qty_sent;
                }
            }
            TransferOrderEvent::OrderDispatched(e) => {
                self.status = OrderStatus::Dispatched;
                self.dispatched_at = Some(e.occurred_at);
            }
            TransferOrderEvent::OrderReceived(e) => {
                self.status = OrderStatus::Received;
                self.received_at = Some(e.occurred_at);
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            TransferOrderCommand::SubmitOrder(cmd) => self.handle_submit(cmd),
            TransferOrderCommand::StartPicking(cmd) => self.handle_start_picking(cmd),
            TransferOrderCommand::SetSentQuantities(cmd) => self.handle_set_sent(cmd),
            TransferOrderCommand::MarkItemFulfilled(cmd) => self.handle_mark_fulfilled(cmd),
            TransferOrderCommand::Dispatch(cmd) => self.handle_dispatch(cmd),
            TransferOrderCommand::ConfirmReceipt(cmd) => self.handle_confirm_receipt(cmd),
        }
    }
}

impl TransferOrder {
    fn ensure_existing(&self, order_id: TransferOrderId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        if self.id != order_id {
            return Err(DomainError::invariant("order_id mismatch"));
        }
        Ok(())
    }

    fn handle_submit(&self, cmd: &SubmitOrder) -> Result<Vec<TransferOrderEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("transfer order already exists"));
        }
        if cmd.items.is_empty() {
            return Err(DomainError::validation("empty cart"));
        }
        if cmd.items.iter().any(|i| i.qty_requested == 0) {
            return Err(DomainError::validation("requested quantity must be positive"));
        }
        let products: BTreeSet<_> = cmd.items.iter().map(|i| i.product_id.0).collect();
        if products.len() != cmd.items.len() {
            return Err(DomainError::invariant("one item per product"));
        }

        self.status.transition(TransferAction::Submit)?;

        Ok(vec![TransferOrderEvent::OrderSubmitted(OrderSubmitted {
            order_id: cmd.order_id,
            from_branch: cmd.from_branch,
            to_branch: cmd.to_branch,
            created_by: cmd.created_by.clone(),
            created_at: cmd.created_at,
            items: cmd.items.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_start_picking(
        &self,
        cmd: &StartPicking,
    ) -> Result<Vec<TransferOrderEvent>, DomainError> {
        self.ensure_existing(cmd.order_id)?;
        self.status.transition(TransferAction::StartPicking)?;

        Ok(vec![TransferOrderEvent::PickingStarted(PickingStarted {
            order_id: cmd.order_id,
            actor: cmd.actor.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_set_sent(
        &self,
        cmd: &SetSentQuantities,
    ) -> Result<Vec<TransferOrderEvent>, DomainError> {
        self.ensure_existing(cmd.order_id)?;
        self.status.ensure_items_editable()?;

        let quantities = cmd
            .quantities
            .iter()
            .filter(|(item_id, _)| self.item(**item_id).is_some())
            .map(|(item_id, value)| SentQuantity {
                item_id: *item_id,
                qty_sent: clamp_sent(*value),
            })
            .collect();

        Ok(vec![TransferOrderEvent::SentQuantitiesSet(SentQuantitiesSet {
            order_id: cmd.order_id,
            actor: cmd.actor.clone(),
            quantities,
            notes: cmd.notes.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_mark_fulfilled(
        &self,
        cmd: &MarkItemFulfilled,
    ) -> Result<Vec<TransferOrderEvent>, DomainError> {
        self.ensure_existing(cmd.order_id)?;
        self.status.ensure_items_editable()?;
        let item = self.item(cmd.item_id).ok_or(DomainError::NotFound)?;

        Ok(vec![TransferOrderEvent::ItemFulfilled(ItemFulfilled {
            order_id: cmd.order_id,
            actor: cmd.actor.clone(),
            item_id: item.item_id,
            product_name: item.product_name.clone(),
            qty_sent: item.qty_requested,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_dispatch(&self, cmd: &Dispatch) -> Result<Vec<TransferOrderEvent>, DomainError> {
        self.ensure_existing(cmd.order_id)?;
        // Partial fulfilment is allowed; no per-item check here.
        self.status.transition(TransferAction::Dispatch)?;

        Ok(vec![TransferOrderEvent::OrderDispatched(OrderDispatched {
            order_id: cmd.order_id,
            actor: cmd.actor.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_confirm_receipt(
        &self,
        cmd: &ConfirmReceipt,
    ) -> Result<Vec<TransferOrderEvent>, DomainError> {
        self.ensure_existing(cmd.order_id)?;
        // Other users cannot see the order at all.
        let is_creator = self
            .created_by
            .as_ref()
            .is_some_and(|c| c.user_id == cmd.actor.user_id);
        if !is_creator {
            return Err(DomainError::NotFound);
        }
        self.status.transition(TransferAction::ConfirmReceipt)?;

        Ok(vec![TransferOrderEvent::OrderReceived(OrderReceived {
            order_id: cmd.order_id,
            actor: cmd.actor.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }
}

fn clamp_sent(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}
