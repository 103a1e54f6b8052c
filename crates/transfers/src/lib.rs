//! Transfers domain module.
//!
//! Inter-branch transfer orders: the requester's [`Cart`], the event-sourced
//! [`TransferOrder`] it turns into on submit, and the status workflow both
//! branches move it through. Pure domain logic (no IO, no HTTP, no storage).

pub mod cart;
pub mod order;
pub mod status;
pub mod view;

pub use cart::{Cart, CartLine};
pub use order::{
    ConfirmReceipt, Dispatch, ItemFulfilled, ItemId, MarkItemFulfilled, OrderDispatched,
    OrderItem, OrderReceived, OrderSubmitted, PickingStarted, SentQuantitiesSet, SentQuantity,
    SetSentQuantities, StartPicking, SubmitOrder, TransferOrder, TransferOrderCommand,
    TransferOrderEvent, TransferOrderId, AGGREGATE_TYPE,
};
pub use status::{Branch, OrderStatus, TransferAction};
pub use view::{OrderLineView, OrderLogEntry, OrderView};
