//! Full pipeline: Command → EventStore → EventBus → Projections → read models.

use std::sync::{Arc, mpsc};
use std::time::Duration;

use chrono::Utc;
use serde_json::Value as JsonValue;

use stocklink_catalog::{
    CreateProduct, PRODUCT_AGGREGATE_TYPE, Product, ProductCommand, ProductId,
};
use stocklink_core::{Actor, AggregateId, UserId};
use stocklink_events::{EventBus, EventEnvelope, InMemoryEventBus, Subscription};
use stocklink_transfers::{
    AGGREGATE_TYPE, Cart, Dispatch, OrderStatus, StartPicking, TransferOrder,
    TransferOrderCommand, TransferOrderId,
};

use crate::carts::CartStore;
use crate::command_dispatcher::{CommandDispatcher, DispatchError};
use crate::event_store::{EventStore, InMemoryEventStore};
use crate::projections::{
    CatalogProjection, OrderLogProjection, ReadModels, TransferOrdersProjection,
};
use crate::read_model::InMemoryReadStore;

type Bus = Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>;
type Orders = TransferOrdersProjection<InMemoryReadStore<TransferOrderId, stocklink_transfers::OrderView>>;
type Log = OrderLogProjection<InMemoryReadStore<TransferOrderId, Vec<stocklink_transfers::OrderLogEntry>>>;
type Catalog = CatalogProjection<
    InMemoryReadStore<stocklink_catalog::CategoryId, crate::projections::CategoryReadModel>,
    InMemoryReadStore<ProductId, crate::projections::ProductReadModel>,
>;

struct Harness {
    dispatcher: CommandDispatcher<Arc<InMemoryEventStore>, Bus>,
    read_models: ReadModels<Arc<InMemoryEventStore>>,
    orders: Arc<Orders>,
    log: Arc<Log>,
    catalog: Arc<Catalog>,
    bus: Bus,
}

fn setup() -> Harness {
    let store = Arc::new(InMemoryEventStore::new());
    let bus: Bus = Arc::new(InMemoryEventBus::new());
    let orders: Arc<Orders> = Arc::new(TransferOrdersProjection::new(InMemoryReadStore::new()));
    let log: Arc<Log> = Arc::new(OrderLogProjection::new(InMemoryReadStore::new()));
    let catalog: Arc<Catalog> = Arc::new(CatalogProjection::new(InMemoryReadStore::new(), InMemoryReadStore::new()));

    let read_models = ReadModels::new(store.clone())
        .register(orders.clone())
        .register(log.clone())
        .register(catalog.clone());

    Harness {
        dispatcher: CommandDispatcher::new(store, bus.clone()),
        read_models,
        orders,
        log,
        catalog,
        bus,
    }
}

fn actor(name: &str) -> Actor {
    Actor::new(UserId::new(), name)
}

fn submit(h: &Harness, id: u64, creator: &Actor) -> TransferOrderId {
    let order_id = TransferOrderId(id);
    let mut cart = Cart::new(creator.clone(), Utc::now());
    cart.add_item(ProductId::new(AggregateId::new()), "Arroz", 3).unwrap();
    cart.add_item(ProductId::new(AggregateId::new()), "Feijão", 1).unwrap();
    let cmd = cart.checkout(order_id, Utc::now()).unwrap();

    h.dispatcher
        .dispatch(
            order_id.aggregate_id(),
            AGGREGATE_TYPE,
            TransferOrderCommand::SubmitOrder(cmd),
            |_| TransferOrder::empty(order_id),
        )
        .unwrap();
    h.read_models.catch_up(order_id.aggregate_id()).unwrap();
    order_id
}

fn start_picking(h: &Harness, order_id: TransferOrderId, picker: &Actor) -> Result<(), DispatchError> {
    h.dispatcher.dispatch(
        order_id.aggregate_id(),
        AGGREGATE_TYPE,
        TransferOrderCommand::StartPicking(StartPicking {
            order_id,
            actor: picker.clone(),
            occurred_at: Utc::now(),
        }),
        |_| TransferOrder::empty(order_id),
    )?;
    h.read_models.catch_up(order_id.aggregate_id()).expect("catch up");
    Ok(())
}

#[test]
fn submit_updates_order_view_and_audit_log() {
    let h = setup();
    let ana = actor("ana");
    let order_id = submit(&h, 1, &ana);

    let view = h.orders.get(order_id).unwrap();
    assert_eq!(view.status, OrderStatus::Submitted);
    assert!(view.submitted_at.is_some());
    assert_eq!(view.items.len(), 2);
    assert_eq!(view.created_by, ana);

    let log = h.log.entries(order_id);
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].action, "submitted");
    assert_eq!(log[0].user.as_ref(), Some(&ana));
}

#[test]
fn failed_transition_changes_nothing() {
    let h = setup();
    let order_id = submit(&h, 1, &actor("ana"));

    let err = h
        .dispatcher
        .dispatch(
            order_id.aggregate_id(),
            AGGREGATE_TYPE,
            TransferOrderCommand::Dispatch(Dispatch {
                order_id,
                actor: actor("bruno"),
                occurred_at: Utc::now(),
            }),
            |_| TransferOrder::empty(order_id),
        )
        .unwrap_err();

    assert!(matches!(err, DispatchError::InvalidTransition(_)));
    assert_eq!(h.orders.get(order_id).unwrap().status, OrderStatus::Submitted);
    assert_eq!(h.log.entries(order_id).len(), 1);
}

#[test]
fn duplicate_order_number_is_a_conflict() {
    let h = setup();
    submit(&h, 5, &actor("ana"));

    let mut cart = Cart::new(actor("carla"), Utc::now());
    cart.add_item(ProductId::new(AggregateId::new()), "Sal", 1).unwrap();
    let cmd = cart.checkout(TransferOrderId(5), Utc::now()).unwrap();

    let err = h
        .dispatcher
        .dispatch(
            TransferOrderId(5).aggregate_id(),
            AGGREGATE_TYPE,
            TransferOrderCommand::SubmitOrder(cmd),
            |_| TransferOrder::empty(TransferOrderId(5)),
        )
        .unwrap_err();
    assert!(matches!(err, DispatchError::Concurrency(_)));
}

#[test]
fn log_is_newest_first() {
    let h = setup();
    let order_id = submit(&h, 1, &actor("ana"));
    start_picking(&h, order_id, &actor("bruno")).unwrap();

    let actions: Vec<_> = h.log.entries(order_id).into_iter().map(|e| e.action).collect();
    assert_eq!(actions, vec!["started picking", "submitted"]);
}

#[test]
fn committed_events_reach_bus_subscribers() {
    let h = setup();
    let sub = h.bus.subscribe();
    let order_id = submit(&h, 1, &actor("ana"));

    let env = sub.recv_timeout(Duration::from_secs(1)).unwrap();
    assert_eq!(env.aggregate_id(), order_id.aggregate_id());
    assert_eq!(env.event_type(), "transfers.order.submitted");
    assert_eq!(env.sequence_number(), 1);
}

#[test]
fn catch_up_is_idempotent_and_rebuild_restores_state() {
    let h = setup();
    let order_id = submit(&h, 1, &actor("ana"));
    start_picking(&h, order_id, &actor("bruno")).unwrap();
    h.read_models.catch_up(order_id.aggregate_id()).unwrap();
    assert_eq!(h.log.entries(order_id).len(), 2);

    let before = h.orders.get(order_id).unwrap();
    let replayed = h.read_models.rebuild(&[AGGREGATE_TYPE]).unwrap();

    assert_eq!(replayed, 2);
    assert_eq!(h.orders.get(order_id).unwrap(), before);
    assert_eq!(h.log.entries(order_id).len(), 2);
}

#[test]
fn product_creation_reaches_catalog_read_model() {
    let h = setup();
    let product_id = ProductId::new(AggregateId::new());
    h.dispatcher
        .dispatch(
            product_id.0,
            PRODUCT_AGGREGATE_TYPE,
            ProductCommand::CreateProduct(CreateProduct {
                product_id,
                sku: "SKU1".to_string(),
                name: "Arroz".to_string(),
                unit: None,
                category_id: None,
                image: None,
                occurred_at: Utc::now(),
            }),
            |id| Product::empty(ProductId::new(id)),
        )
        .unwrap();
    h.read_models.catch_up(product_id.0).unwrap();

    let p = h.catalog.find_by_sku("SKU1").unwrap();
    assert_eq!(p.product_id, product_id);
    assert!(p.active);
    assert_eq!(h.catalog.active_products().len(), 1);
    assert_eq!(h.dispatcher.store().load_stream(product_id.0).unwrap().len(), 1);
}

/// Bus that accepts subscribers but refuses every publish.
struct DownBus;

impl EventBus<EventEnvelope<JsonValue>> for DownBus {
    type Error = &'static str;

    fn publish(&self, _message: EventEnvelope<JsonValue>) -> Result<(), Self::Error> {
        Err("bus down")
    }

    fn subscribe(&self) -> Subscription<EventEnvelope<JsonValue>> {
        let (_tx, rx) = mpsc::channel();
        Subscription::new(rx)
    }
}

#[test]
fn submit_commits_and_clears_cart_when_bus_is_down() {
    let store = Arc::new(InMemoryEventStore::new());
    let dispatcher = CommandDispatcher::new(store.clone(), DownBus);
    let carts = CartStore::new();
    let ana = actor("ana");
    let order_id = TransferOrderId(1);

    carts
        .update(&ana, Utc::now(), |c| {
            c.add_item(ProductId::new(AggregateId::new()), "Arroz", 2)
        })
        .unwrap();

    let committed = carts
        .checkout(&ana, Utc::now(), |cart| {
            let cmd = cart.checkout(order_id, Utc::now())?;
            dispatcher.dispatch(
                order_id.aggregate_id(),
                AGGREGATE_TYPE,
                TransferOrderCommand::SubmitOrder(cmd),
                |_| TransferOrder::empty(order_id),
            )
        })
        .unwrap();

    assert_eq!(committed.len(), 1);
    assert_eq!(carts.line_count(ana.user_id), 0);
    assert_eq!(store.load_stream(order_id.aggregate_id()).unwrap().len(), 1);

    // A retry finds an empty cart rather than submitting a second order.
    let retry: Result<_, DispatchError> = carts.checkout(&ana, Utc::now(), |cart| {
        cart.checkout(TransferOrderId(2), Utc::now()).map_err(DispatchError::from)
    });
    assert!(matches!(retry, Err(DispatchError::Validation(_))));
}
