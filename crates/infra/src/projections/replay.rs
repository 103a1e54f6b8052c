//! Feeding projections from the event store.
//!
//! Services call [`ReadModels::catch_up`] after every successful dispatch so a
//! request can read its own writes. Applying from the store (instead of from
//! the envelopes in hand) keeps projections gap-free when two requests commit
//! to the same stream concurrently.

use std::sync::{Arc, Mutex};

use thiserror::Error;

use stocklink_core::AggregateId;

use super::{Projection, ProjectionError};
use crate::event_store::{EventStore, EventStoreError, StoredEvent};

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("event store error: {0}")]
    EventStore(#[from] EventStoreError),

    #[error("projection {projection} failed: {source}")]
    Projection {
        projection: &'static str,
        #[source]
        source: ProjectionError,
    },

    #[error("read models lock poisoned")]
    Poisoned,
}

/// The registered projections plus the store they are fed from.
pub struct ReadModels<S> {
    store: S,
    projections: Vec<Arc<dyn Projection>>,
    apply_lock: Mutex<()>,
}

impl<S: EventStore> ReadModels<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            projections: Vec::new(),
            apply_lock: Mutex::new(()),
        }
    }

    pub fn register(mut self, projection: Arc<dyn Projection>) -> Self {
        self.projections.push(projection);
        self
    }

    /// Apply everything in one stream that projections have not seen yet.
    pub fn catch_up(&self, aggregate_id: AggregateId) -> Result<(), ReplayError> {
        let _guard = self.apply_lock.lock().map_err(|_| ReplayError::Poisoned)?;
        let stream = self.store.load_stream(aggregate_id)?;
        self.apply_all(&stream)
    }

    /// Clear every projection and replay the given aggregate types.
    ///
    /// Returns the number of events replayed.
    pub fn rebuild(&self, aggregate_types: &[&str]) -> Result<usize, ReplayError> {
        let _guard = self.apply_lock.lock().map_err(|_| ReplayError::Poisoned)?;
        for p in &self.projections {
            p.clear();
        }

        let mut replayed = 0;
        for aggregate_type in aggregate_types {
            let events = self.store.load_all(aggregate_type)?;
            self.apply_all(&events)?;
            replayed += events.len();
        }

        tracing::info!(events = replayed, projections = self.projections.len(), "read models rebuilt");
        Ok(replayed)
    }

    fn apply_all(&self, events: &[StoredEvent]) -> Result<(), ReplayError> {
        for stored in events {
            let envelope = stored.to_envelope();
            for p in &self.projections {
                p.apply_envelope(&envelope).map_err(|source| ReplayError::Projection {
                    projection: p.name(),
                    source,
                })?;
            }
        }
        Ok(())
    }
}
