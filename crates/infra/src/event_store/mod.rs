//! Append-only event store boundary.
//!
//! Storage-agnostic: the service runs on [`InMemoryEventStore`], other backends
//! implement [`EventStore`].

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryEventStore;
pub use r#trait::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};
