//! Infrastructure layer: event store, command dispatch, read models and the
//! in-process stores the service runs on.

pub mod carts;
pub mod command_dispatcher;
pub mod event_store;
pub mod projections;
pub mod read_model;
pub mod sequence;
pub mod workers;

#[cfg(test)]
mod integration_tests;
