//! Infrastructure wiring and the application operations the routes call.
//!
//! Every write goes through the command dispatcher and is followed by a
//! read-model catch-up on the written stream, so a handler always answers from
//! read models that include its own write.

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_stream::{StreamExt, wrappers::BroadcastStream};

use stocklink_catalog::{
    CATEGORY_AGGREGATE_TYPE, Category, CategoryCommand, CategoryId, CreateCategory,
    CreateProduct, PRODUCT_AGGREGATE_TYPE, Product, ProductCommand, ProductId, UpdateCategory,
    UpdateProduct,
};
use stocklink_core::{Actor, AggregateId, DomainError, UserId};
use stocklink_events::{EventEnvelope, InMemoryEventBus};
use stocklink_infra::{
    carts::CartStore,
    command_dispatcher::{CommandDispatcher, DispatchError},
    event_store::InMemoryEventStore,
    projections::{
        CatalogProjection, CategoryReadModel, CategoryWithProducts, OrderLogProjection,
        ProductReadModel, ReadModels, ReplayError, TransferOrdersProjection,
    },
    read_model::InMemoryReadStore,
    sequence::OrderNumbers,
    workers::{BusWorker, WorkerHandle},
};
use stocklink_reports::{
    LocalTime, ReportError, ReportFilter, ReportKind, ReportMode, query_orders, render_pdf,
};
use stocklink_transfers::{
    AGGREGATE_TYPE as ORDER_AGGREGATE_TYPE, Cart, CartLine, ConfirmReceipt, Dispatch, ItemId,
    MarkItemFulfilled, OrderLogEntry, OrderStatus, OrderView, SetSentQuantities, StartPicking,
    TransferOrder, TransferOrderCommand, TransferOrderEvent, TransferOrderId,
};

type Store = Arc<InMemoryEventStore>;
type Bus = Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>;
type Dispatcher = CommandDispatcher<Store, Bus>;
type Catalog = CatalogProjection<
    InMemoryReadStore<CategoryId, CategoryReadModel>,
    InMemoryReadStore<ProductId, ProductReadModel>,
>;
type Orders = TransferOrdersProjection<InMemoryReadStore<TransferOrderId, OrderView>>;
type OrderLog = OrderLogProjection<InMemoryReadStore<TransferOrderId, Vec<OrderLogEntry>>>;

const ALL_AGGREGATE_TYPES: [&str; 3] = [
    CATEGORY_AGGREGATE_TYPE,
    PRODUCT_AGGREGATE_TYPE,
    ORDER_AGGREGATE_TYPE,
];

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("read model update failed: {0}")]
    ReadModel(#[from] ReplayError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error("failed to start background worker: {0}")]
    Startup(#[from] std::io::Error),
}

impl From<DomainError> for ServiceError {
    fn from(value: DomainError) -> Self {
        ServiceError::Dispatch(value.into())
    }
}

/// Realtime message broadcast via SSE.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RealtimeMessage {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub order_id: TransferOrderId,
    pub message: String,
}

impl RealtimeMessage {
    pub const ORDER_UPDATE: &'static str = "order_update";

    pub fn from_event(event: &TransferOrderEvent) -> Self {
        let id = event.order_id();
        let message = match event {
            TransferOrderEvent::OrderSubmitted(e) => {
                format!("Order #{id} submitted by {}", e.created_by.username)
            }
            TransferOrderEvent::PickingStarted(e) => {
                format!("Order #{id}: picking started by {}", e.actor.username)
            }
            TransferOrderEvent::SentQuantitiesSet(_) => format!("Order #{id}: sent quantities updated"),
            TransferOrderEvent::ItemFulfilled(e) => format!("Order #{id}: {} marked OK", e.product_name),
            TransferOrderEvent::OrderDispatched(_) => format!("Order #{id} dispatched"),
            TransferOrderEvent::OrderReceived(_) => format!("Order #{id} received"),
        };
        Self {
            kind: Self::ORDER_UPDATE,
            order_id: id,
            message,
        }
    }
}

/// An order together with its audit log (newest first).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: OrderView,
    pub log: Vec<OrderLogEntry>,
}

pub struct AppServices {
    dispatcher: Dispatcher,
    read_models: ReadModels<Store>,
    catalog: Arc<Catalog>,
    orders: Arc<Orders>,
    order_log: Arc<OrderLog>,
    carts: CartStore,
    order_numbers: OrderNumbers,
    // Serializes the uniqueness checks on category names and SKUs.
    catalog_writes: Mutex<()>,
    clock: LocalTime,
    realtime_tx: broadcast::Sender<RealtimeMessage>,
    _notifier: WorkerHandle,
}

impl AppServices {
    /// Fresh in-memory wiring (dev/test).
    pub fn in_memory(clock: LocalTime, realtime_buffer: usize) -> Result<Self, ServiceError> {
        Self::with_store(Arc::new(InMemoryEventStore::new()), clock, realtime_buffer)
    }

    /// Wire services over an existing store, rebuilding every read model
    /// from its history.
    pub fn with_store(store: Store, clock: LocalTime, realtime_buffer: usize) -> Result<Self, ServiceError> {
        let bus: Bus = Arc::new(InMemoryEventBus::new());

        let catalog: Arc<Catalog> = Arc::new(CatalogProjection::new(InMemoryReadStore::new(), InMemoryReadStore::new()));
        let orders: Arc<Orders> = Arc::new(TransferOrdersProjection::new(InMemoryReadStore::new()));
        let order_log: Arc<OrderLog> = Arc::new(OrderLogProjection::new(InMemoryReadStore::new()));

        let read_models = ReadModels::new(store.clone())
            .register(catalog.clone())
            .register(orders.clone())
            .register(order_log.clone());
        read_models.rebuild(&ALL_AGGREGATE_TYPES)?;

        // Realtime channel (SSE): lossy broadcast fed by a bus worker.
        let (realtime_tx, _realtime_rx) = broadcast::channel::<RealtimeMessage>(realtime_buffer.max(1));
        let notifier = {
            let tx = realtime_tx.clone();
            BusWorker::spawn("order-notifier", &bus, move |env: EventEnvelope<JsonValue>| -> Result<(), serde_json::Error> {
                if env.aggregate_type() != ORDER_AGGREGATE_TYPE {
                    return Ok(());
                }
                let event: TransferOrderEvent = serde_json::from_value(env.payload().clone())?;
                // No subscribers is not an error.
                let _ = tx.send(RealtimeMessage::from_event(&event));
                Ok(())
            })?
        };

        let order_numbers = OrderNumbers::starting_after(orders.max_order_id());

        Ok(Self {
            dispatcher: CommandDispatcher::new(store, bus),
            read_models,
            catalog,
            orders,
            order_log,
            carts: CartStore::new(),
            order_numbers,
            catalog_writes: Mutex::new(()),
            clock,
            realtime_tx,
            _notifier: notifier,
        })
    }

    pub fn clock(&self) -> &LocalTime {
        &self.clock
    }

    pub fn realtime_tx(&self) -> &broadcast::Sender<RealtimeMessage> {
        &self.realtime_tx
    }

    fn lock_catalog(&self) -> MutexGuard<'_, ()> {
        self.catalog_writes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ---------------------------------------------------------------------
    // Catalog
    // ---------------------------------------------------------------------

    pub fn categories(&self) -> Vec<CategoryReadModel> {
        self.catalog.categories()
    }

    pub fn products(&self) -> Vec<ProductReadModel> {
        self.catalog.products()
    }

    pub fn active_catalog(&self) -> Vec<CategoryWithProducts> {
        self.catalog.active_categories_with_products()
    }

    pub fn active_products(&self) -> Vec<ProductReadModel> {
        self.catalog.active_products()
    }

    pub fn create_category(&self, name: String, image: Option<String>) -> Result<CategoryReadModel, ServiceError> {
        let _guard = self.lock_catalog();
        if self.catalog.find_category_by_name(name.trim()).is_some() {
            return Err(DomainError::conflict("category name already exists").into());
        }

        let category_id = CategoryId::new(AggregateId::new());
        let cmd = CategoryCommand::CreateCategory(CreateCategory {
            category_id,
            name,
            image,
            occurred_at: Utc::now(),
        });
        self.dispatch_category(category_id, cmd)
    }

    pub fn update_category(
        &self,
        category_id: CategoryId,
        name: Option<String>,
        image: Option<String>,
        active: Option<bool>,
    ) -> Result<CategoryReadModel, ServiceError> {
        let _guard = self.lock_catalog();
        if let Some(name) = name.as_deref() {
            let taken = self
                .catalog
                .find_category_by_name(name.trim())
                .is_some_and(|c| c.category_id != category_id);
            if taken {
                return Err(DomainError::conflict("category name already exists").into());
            }
        }

        let cmd = CategoryCommand::UpdateCategory(UpdateCategory {
            category_id,
            name,
            image,
            active,
            occurred_at: Utc::now(),
        });
        self.dispatch_category(category_id, cmd)
    }

    fn dispatch_category(&self, category_id: CategoryId, cmd: CategoryCommand) -> Result<CategoryReadModel, ServiceError> {
        self.dispatcher.dispatch(category_id.0, CATEGORY_AGGREGATE_TYPE, cmd, |id| {
            Category::empty(CategoryId::new(id))
        })?;
        self.read_models.catch_up(category_id.0)?;
        self.catalog
            .category(&category_id)
            .ok_or_else(|| DomainError::NotFound.into())
    }

    pub fn create_product(
        &self,
        sku: String,
        name: String,
        unit: Option<String>,
        category_id: Option<CategoryId>,
        image: Option<String>,
    ) -> Result<ProductReadModel, ServiceError> {
        let _guard = self.lock_catalog();
        if self.catalog.find_by_sku(sku.trim()).is_some() {
            return Err(DomainError::conflict("sku already exists").into());
        }
        self.ensure_category(category_id)?;

        let product_id = ProductId::new(AggregateId::new());
        let cmd = ProductCommand::CreateProduct(CreateProduct {
            product_id,
            sku,
            name,
            unit,
            category_id,
            image,
            occurred_at: Utc::now(),
        });
        self.dispatch_product(product_id, cmd)
    }

    /// `category_id: Some(None)` clears the category.
    pub fn update_product(
        &self,
        product_id: ProductId,
        name: Option<String>,
        unit: Option<String>,
        category_id: Option<Option<CategoryId>>,
        image: Option<String>,
        active: Option<bool>,
    ) -> Result<ProductReadModel, ServiceError> {
        self.ensure_category(category_id.flatten())?;

        let cmd = ProductCommand::UpdateProduct(UpdateProduct {
            product_id,
            name,
            unit,
            category_id,
            image,
            active,
            occurred_at: Utc::now(),
        });
        self.dispatch_product(product_id, cmd)
    }

    fn ensure_category(&self, category_id: Option<CategoryId>) -> Result<(), ServiceError> {
        match category_id {
            Some(id) if self.catalog.category(&id).is_none() => {
                Err(DomainError::validation("unknown category").into())
            }
            _ => Ok(()),
        }
    }

    fn dispatch_product(&self, product_id: ProductId, cmd: ProductCommand) -> Result<ProductReadModel, ServiceError> {
        self.dispatcher.dispatch(product_id.0, PRODUCT_AGGREGATE_TYPE, cmd, |id| {
            Product::empty(ProductId::new(id))
        })?;
        self.read_models.catch_up(product_id.0)?;
        self.catalog
            .product(&product_id)
            .ok_or_else(|| DomainError::NotFound.into())
    }

    // ---------------------------------------------------------------------
    // Cart
    // ---------------------------------------------------------------------

    pub fn cart(&self, owner: &Actor) -> Cart {
        self.carts.get_or_create(owner, Utc::now())
    }

    pub fn cart_count(&self, user_id: UserId) -> usize {
        self.carts.line_count(user_id)
    }

    pub fn add_to_cart(&self, owner: &Actor, product_id: ProductId, qty: i64) -> Result<ItemId, ServiceError> {
        if qty <= 0 {
            return Err(DomainError::validation("quantity must be positive").into());
        }
        let product = self
            .catalog
            .product(&product_id)
            .filter(|p| p.active)
            .ok_or(DomainError::NotFound)?;

        let item_id = self.carts.update(owner, Utc::now(), |cart| {
            cart.add_item(product.product_id, product.name.clone(), qty)
        })?;
        tracing::debug!(user = %owner.username, sku = %product.sku, qty, "added to cart");
        Ok(item_id)
    }

    pub fn update_cart(&self, owner: &Actor, quantities: &BTreeMap<ItemId, i64>) -> Result<Cart, ServiceError> {
        Ok(self.carts.update(owner, Utc::now(), |cart| {
            cart.update_quantities(quantities)?;
            Ok(cart.clone())
        })?)
    }

    pub fn remove_from_cart(&self, owner: &Actor, item_id: ItemId) -> Result<CartLine, ServiceError> {
        Ok(self.carts.update(owner, Utc::now(), |cart| cart.remove_item(item_id))?)
    }

    /// Submit the owner's cart as a new transfer order.
    ///
    /// The cart is discarded only once the order's first event is stored; an
    /// empty cart is rejected and left as it was.
    pub fn submit_cart(&self, owner: &Actor) -> Result<OrderView, ServiceError> {
        let now = Utc::now();
        let order_id = self.carts.checkout(owner, now, |cart| {
            if cart.is_empty() {
                return Err(ServiceError::from(DomainError::validation("empty cart")));
            }
            let order_id = self.order_numbers.next();
            let cmd = cart.checkout(order_id, now)?;
            self.dispatch_order(order_id, TransferOrderCommand::SubmitOrder(cmd))?;
            Ok(order_id)
        })?;

        tracing::info!(order_id = %order_id, user = %owner.username, "order submitted");
        self.refresh_order(order_id)
    }

    // ---------------------------------------------------------------------
    // Order views
    // ---------------------------------------------------------------------

    /// The caller's open orders created today (local date), newest first.
    pub fn requester_orders(&self, user_id: UserId) -> Vec<OrderView> {
        let today = self.clock.date(Utc::now());
        self.orders
            .list()
            .into_iter()
            .filter(|o| o.is_created_by(user_id))
            .filter(|o| !matches!(o.status, OrderStatus::Draft | OrderStatus::Received))
            .filter(|o| self.clock.date(o.created_at) == today)
            .collect()
    }

    /// One of the caller's own orders; other users' orders are not found.
    pub fn requester_order(&self, user_id: UserId, order_id: TransferOrderId) -> Result<OrderDetail, ServiceError> {
        let detail = self.order_detail(order_id)?;
        if !detail.order.is_created_by(user_id) {
            return Err(DomainError::NotFound.into());
        }
        Ok(detail)
    }

    /// Orders waiting on the supplier, newest first.
    pub fn supplier_orders(&self) -> Vec<OrderView> {
        self.orders
            .list_with_status(&[OrderStatus::Submitted, OrderStatus::Picking])
    }

    pub fn order(&self, order_id: TransferOrderId) -> Result<OrderView, ServiceError> {
        self.orders
            .get(order_id)
            .ok_or_else(|| DomainError::NotFound.into())
    }

    pub fn order_detail(&self, order_id: TransferOrderId) -> Result<OrderDetail, ServiceError> {
        let order = self.order(order_id)?;
        Ok(OrderDetail {
            order,
            log: self.order_log.entries(order_id),
        })
    }

    pub fn submitted_count(&self) -> usize {
        self.orders.count_with_status(OrderStatus::Submitted)
    }

    pub fn newest_submitted(&self) -> Option<TransferOrderId> {
        self.orders.newest_with_status(OrderStatus::Submitted)
    }

    // ---------------------------------------------------------------------
    // Fulfilment
    // ---------------------------------------------------------------------

    pub fn start_picking(&self, actor: &Actor, order_id: TransferOrderId) -> Result<OrderView, ServiceError> {
        self.transition(
            order_id,
            TransferOrderCommand::StartPicking(StartPicking {
                order_id,
                actor: actor.clone(),
                occurred_at: Utc::now(),
            }),
        )
    }

    pub fn set_sent_quantities(
        &self,
        actor: &Actor,
        order_id: TransferOrderId,
        quantities: BTreeMap<ItemId, i64>,
        notes: Option<String>,
    ) -> Result<OrderView, ServiceError> {
        self.transition(
            order_id,
            TransferOrderCommand::SetSentQuantities(SetSentQuantities {
                order_id,
                actor: actor.clone(),
                quantities,
                notes,
                occurred_at: Utc::now(),
            }),
        )
    }

    pub fn set_sent_quantity(
        &self,
        actor: &Actor,
        order_id: TransferOrderId,
        item_id: ItemId,
        qty: i64,
    ) -> Result<OrderView, ServiceError> {
        self.set_sent_quantities(actor, order_id, BTreeMap::from([(item_id, qty)]), None)
    }

    pub fn mark_item_fulfilled(
        &self,
        actor: &Actor,
        order_id: TransferOrderId,
        item_id: ItemId,
    ) -> Result<OrderView, ServiceError> {
        self.transition(
            order_id,
            TransferOrderCommand::MarkItemFulfilled(MarkItemFulfilled {
                order_id,
                actor: actor.clone(),
                item_id,
                occurred_at: Utc::now(),
            }),
        )
    }

    pub fn dispatch(&self, actor: &Actor, order_id: TransferOrderId) -> Result<OrderView, ServiceError> {
        self.transition(
            order_id,
            TransferOrderCommand::Dispatch(Dispatch {
                order_id,
                actor: actor.clone(),
                occurred_at: Utc::now(),
            }),
        )
    }

    pub fn confirm_received(&self, actor: &Actor, order_id: TransferOrderId) -> Result<OrderView, ServiceError> {
        self.transition(
            order_id,
            TransferOrderCommand::ConfirmReceipt(ConfirmReceipt {
                order_id,
                actor: actor.clone(),
                occurred_at: Utc::now(),
            }),
        )
    }

    fn transition(&self, order_id: TransferOrderId, cmd: TransferOrderCommand) -> Result<OrderView, ServiceError> {
        self.dispatch_order(order_id, cmd)?;
        let view = self.refresh_order(order_id)?;
        tracing::info!(order_id = %order_id, status = view.status.code(), "order updated");
        Ok(view)
    }

    fn dispatch_order(&self, order_id: TransferOrderId, cmd: TransferOrderCommand) -> Result<(), DispatchError> {
        self.dispatcher.dispatch(order_id.aggregate_id(), ORDER_AGGREGATE_TYPE, cmd, |_| {
            TransferOrder::empty(order_id)
        })?;
        Ok(())
    }

    fn refresh_order(&self, order_id: TransferOrderId) -> Result<OrderView, ServiceError> {
        self.read_models.catch_up(order_id.aggregate_id())?;
        self.order(order_id)
    }

    // ---------------------------------------------------------------------
    // Reports
    // ---------------------------------------------------------------------

    /// On-screen report; blank until a full date range or another filter is set.
    pub fn report(&self, filter: &ReportFilter) -> Vec<OrderView> {
        query_orders(&self.orders.list(), filter, ReportMode::Interactive, &self.clock)
    }

    pub fn report_pdf(&self, kind: ReportKind, filter: &ReportFilter) -> Result<Vec<u8>, ServiceError> {
        let orders = query_orders(&self.orders.list(), filter, ReportMode::Export, &self.clock);
        Ok(render_pdf(&orders, kind.title(), kind.operator_field(), &self.clock)?)
    }

    pub fn order_pdf(&self, kind: ReportKind, order_id: TransferOrderId) -> Result<Vec<u8>, ServiceError> {
        let order = self.order(order_id)?;
        Ok(render_pdf(&[order], kind.title(), kind.operator_field(), &self.clock)?)
    }
}

/// Server-sent event stream of realtime order updates.
pub fn order_sse_stream(
    services: Arc<AppServices>,
) -> Sse<impl tokio_stream::Stream<Item = Result<SseEvent, Infallible>>> {
    let rx = services.realtime_tx().subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|msg| match msg {
        Ok(m) => {
            let data = serde_json::to_string(&m).unwrap_or_else(|_| "{}".to_string());
            Some(Ok(SseEvent::default().event(m.kind).data(data)))
        }
        // Lagged receivers skip what they missed.
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn services() -> AppServices {
        AppServices::in_memory(LocalTime::default(), 16).unwrap()
    }

    fn actor(name: &str) -> Actor {
        Actor::new(UserId::new(), name)
    }

    fn product(s: &AppServices, sku: &str, name: &str) -> ProductId {
        s.create_product(sku.into(), name.into(), None, None, None)
            .unwrap()
            .product_id
    }

    fn submitted_order(s: &AppServices, owner: &Actor) -> OrderView {
        let p = product(s, &format!("SKU-{}", owner.username), "Arroz");
        s.add_to_cart(owner, p, 4).unwrap();
        s.submit_cart(owner).unwrap()
    }

    fn dispatch_err(err: ServiceError) -> DispatchError {
        match err {
            ServiceError::Dispatch(e) => e,
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn full_transfer_scenario() {
        let s = services();
        let a = actor("ana");
        let b = actor("bruno");
        let sku1 = product(&s, "SKU1", "Arroz");

        s.add_to_cart(&a, sku1, 3).unwrap();
        s.add_to_cart(&a, sku1, 2).unwrap();
        let cart = s.cart(&a);
        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.lines()[0].qty_requested, 5);

        let order = s.submit_cart(&a).unwrap();
        let id = order.order_id;
        assert_eq!(order.status, OrderStatus::Submitted);
        assert!(order.submitted_at.is_some());
        assert_eq!(s.order_detail(id).unwrap().log.len(), 1);
        assert_eq!(s.cart_count(a.user_id), 0);

        let order = s.start_picking(&b, id).unwrap();
        assert_eq!(order.status, OrderStatus::Picking);
        assert_eq!(order.picking_by, Some(b.clone()));

        let item = order.items[0].item_id;
        s.set_sent_quantity(&b, id, item, 5).unwrap();
        let order = s.dispatch(&b, id).unwrap();
        assert_eq!(order.status, OrderStatus::Dispatched);

        let order = s.confirm_received(&a, id).unwrap();
        assert_eq!(order.status, OrderStatus::Received);
        assert!(order.received_at.is_some());

        let log: Vec<_> = s.order_detail(id).unwrap().log.into_iter().map(|e| e.action).collect();
        assert_eq!(log, vec!["confirmed receipt", "dispatched", "started picking", "submitted"]);
    }

    #[test]
    fn empty_cart_submit_fails_and_keeps_numbering() {
        let s = services();
        let a = actor("ana");

        let err = s.submit_cart(&a).unwrap_err();
        assert!(matches!(dispatch_err(err), DispatchError::Validation(_)));

        let order = submitted_order(&s, &a);
        assert_eq!(order.order_id, TransferOrderId(1));
    }

    #[test]
    fn oversized_cart_update_is_rejected_without_losing_the_line() {
        let s = services();
        let a = actor("ana");
        let p = product(&s, "SKU1", "Arroz");
        let item = s.add_to_cart(&a, p, 3).unwrap();

        let err = s
            .update_cart(&a, &BTreeMap::from([(item, 5_000_000_000)]))
            .unwrap_err();
        assert!(matches!(dispatch_err(err), DispatchError::Validation(_)));
        assert_eq!(s.cart(&a).lines()[0].qty_requested, 3);

        let cart = s.update_cart(&a, &BTreeMap::from([(item, 0)])).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn product_edit_and_deactivation_apply_together() {
        let s = services();
        let p = product(&s, "SKU1", "Arroz");

        let err = s
            .update_product(p, Some("  ".into()), None, None, None, Some(false))
            .unwrap_err();
        assert!(matches!(dispatch_err(err), DispatchError::Validation(_)));
        assert!(s.active_products().iter().any(|x| x.product_id == p));

        let updated = s
            .update_product(p, Some("Arroz 5kg".into()), None, None, None, Some(false))
            .unwrap();
        assert_eq!(updated.name, "Arroz 5kg");
        assert!(!updated.active);
    }

    #[test]
    fn adding_inactive_or_unknown_products_is_not_found() {
        let s = services();
        let a = actor("ana");
        let p = product(&s, "SKU1", "Arroz");
        s.update_product(p, None, None, None, None, Some(false)).unwrap();

        let err = s.add_to_cart(&a, p, 1).unwrap_err();
        assert!(matches!(dispatch_err(err), DispatchError::NotFound));

        let err = s.add_to_cart(&a, ProductId::new(AggregateId::new()), 1).unwrap_err();
        assert!(matches!(dispatch_err(err), DispatchError::NotFound));

        let err = s.add_to_cart(&a, p, 0).unwrap_err();
        assert!(matches!(dispatch_err(err), DispatchError::Validation(_)));
    }

    #[test]
    fn negative_sent_quantity_becomes_zero_and_partial_dispatch_is_allowed() {
        let s = services();
        let a = actor("ana");
        let b = actor("bruno");
        let id = submitted_order(&s, &a).order_id;

        let order = s.start_picking(&b, id).unwrap();
        let item = order.items[0].item_id;
        let order = s.set_sent_quantity(&b, id, item, -5).unwrap();
        assert_eq!(order.items[0].qty_sent, 0);
        assert_eq!(order.items[0].missing_qty, 4);

        assert_eq!(s.dispatch(&b, id).unwrap().status, OrderStatus::Dispatched);
    }

    #[test]
    fn start_picking_twice_is_an_invalid_transition() {
        let s = services();
        let id = submitted_order(&s, &actor("ana")).order_id;
        let b = actor("bruno");
        s.start_picking(&b, id).unwrap();

        let err = s.start_picking(&b, id).unwrap_err();
        assert!(matches!(dispatch_err(err), DispatchError::InvalidTransition(_)));
        assert_eq!(s.order(id).unwrap().status, OrderStatus::Picking);
    }

    #[test]
    fn only_the_creator_sees_and_confirms_an_order() {
        let s = services();
        let a = actor("ana");
        let c = actor("carla");
        let b = actor("bruno");
        let id = submitted_order(&s, &a).order_id;

        assert!(s.requester_order(a.user_id, id).is_ok());
        assert!(matches!(
            dispatch_err(s.requester_order(c.user_id, id).unwrap_err()),
            DispatchError::NotFound
        ));
        assert_eq!(s.requester_orders(a.user_id).len(), 1);
        assert!(s.requester_orders(c.user_id).is_empty());

        s.start_picking(&b, id).unwrap();
        s.dispatch(&b, id).unwrap();
        assert!(matches!(
            dispatch_err(s.confirm_received(&c, id).unwrap_err()),
            DispatchError::NotFound
        ));
    }

    #[test]
    fn supplier_queue_and_poll() {
        let s = services();
        assert_eq!(s.newest_submitted(), None);

        let first = submitted_order(&s, &actor("ana")).order_id;
        let second = submitted_order(&s, &actor("carla")).order_id;
        s.start_picking(&actor("bruno"), first).unwrap();

        assert_eq!(s.submitted_count(), 1);
        assert_eq!(s.newest_submitted(), Some(second));
        assert_eq!(s.supplier_orders().len(), 2);
    }

    #[test]
    fn catalog_names_and_skus_are_unique() {
        let s = services();
        let cat = s.create_category("Grãos".into(), None).unwrap();
        assert!(matches!(
            dispatch_err(s.create_category("grãos".into(), None).unwrap_err()),
            DispatchError::Concurrency(_)
        ));

        s.create_product("SKU1".into(), "Arroz".into(), None, Some(cat.category_id), None)
            .unwrap();
        assert!(matches!(
            dispatch_err(s.create_product("SKU1".into(), "Outro".into(), None, None, None).unwrap_err()),
            DispatchError::Concurrency(_)
        ));
        assert!(matches!(
            dispatch_err(
                s.create_product("SKU2".into(), "Feijão".into(), None, Some(CategoryId::new(AggregateId::new())), None)
                    .unwrap_err()
            ),
            DispatchError::Validation(_)
        ));

        let listed = s.active_catalog();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].products.len(), 1);
    }

    #[test]
    fn report_modes_differ_on_empty_filter() {
        let s = services();
        submitted_order(&s, &actor("ana"));

        assert!(s.report(&ReportFilter::default()).is_empty());
        let pdf = s.report_pdf(ReportKind::Supplier, &ReportFilter::default()).unwrap();
        assert!(pdf.starts_with(b"%PDF"));
    }

    #[test]
    fn transitions_are_broadcast() {
        let s = services();
        let mut rx = s.realtime_tx().subscribe();
        let id = submitted_order(&s, &actor("ana")).order_id;

        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        let msg = loop {
            match rx.try_recv() {
                Ok(m) => break m,
                Err(_) if std::time::Instant::now() < deadline => {
                    std::thread::sleep(Duration::from_millis(10))
                }
                Err(e) => panic!("no realtime message: {e:?}"),
            }
        };
        assert_eq!(msg.kind, RealtimeMessage::ORDER_UPDATE);
        assert_eq!(msg.order_id, id);
    }

    #[test]
    fn rebuilding_over_an_existing_store_restores_state() {
        let store: Store = Arc::new(InMemoryEventStore::new());
        let s = AppServices::with_store(store.clone(), LocalTime::default(), 16).unwrap();
        let a = actor("ana");
        let id = submitted_order(&s, &a).order_id;
        drop(s);

        let restarted = AppServices::with_store(store, LocalTime::default(), 16).unwrap();
        assert_eq!(restarted.order(id).unwrap().status, OrderStatus::Submitted);
        assert_eq!(restarted.products().len(), 1);

        let next = submitted_order(&restarted, &actor("carla")).order_id;
        assert_eq!(next, TransferOrderId(id.0 + 1));
    }
}
