//! Projections (read model builders).
//!
//! Every projection is rebuildable from the event store and idempotent:
//! envelopes at or below the per-stream cursor are skipped, gaps are errors.

pub mod catalog;
pub mod order_log;
pub mod replay;
pub mod transfer_orders;

use std::collections::HashMap;
use std::sync::RwLock;

use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use thiserror::Error;

use stocklink_core::AggregateId;
use stocklink_events::EventEnvelope;

pub use catalog::{
    CatalogProjection, CategoryReadModel, CategoryWithProducts, ProductReadModel,
};
pub use order_log::OrderLogProjection;
pub use replay::{ReadModels, ReplayError};
pub use transfer_orders::TransferOrdersProjection;

#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("failed to deserialize {aggregate_type} event: {message}")]
    Deserialize {
        aggregate_type: String,
        message: String,
    },
    #[error("event does not belong to its envelope stream: {0}")]
    StreamMismatch(String),
    #[error("non-monotonic sequence number (last={last}, found={found})")]
    NonMonotonicSequence { last: u64, found: u64 },
    #[error("event for unknown record: {0}")]
    UnknownRecord(String),
}

/// A consumer of committed events.
pub trait Projection: Send + Sync {
    fn name(&self) -> &'static str;

    fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError>;

    /// Drop all state (before a rebuild).
    fn clear(&self);
}

/// Per-stream high-water marks.
#[derive(Debug, Default)]
pub(crate) struct Cursors {
    inner: RwLock<HashMap<AggregateId, u64>>,
}

impl Cursors {
    /// `Ok(false)` when the envelope was already applied.
    pub(crate) fn should_apply(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<bool, ProjectionError> {
        let seq = envelope.sequence_number();
        let last = self
            .inner
            .read()
            .map(|c| c.get(&envelope.aggregate_id()).copied().unwrap_or(0))
            .unwrap_or(0);

        if seq == 0 {
            return Err(ProjectionError::NonMonotonicSequence { last, found: seq });
        }
        if seq <= last {
            return Ok(false);
        }
        if seq != last + 1 {
            return Err(ProjectionError::NonMonotonicSequence { last, found: seq });
        }
        Ok(true)
    }

    pub(crate) fn advance(&self, envelope: &EventEnvelope<JsonValue>) {
        if let Ok(mut c) = self.inner.write() {
            c.insert(envelope.aggregate_id(), envelope.sequence_number());
        }
    }

    pub(crate) fn clear(&self) {
        if let Ok(mut c) = self.inner.write() {
            c.clear();
        }
    }
}

pub(crate) fn decode<E: DeserializeOwned>(
    envelope: &EventEnvelope<JsonValue>,
) -> Result<E, ProjectionError> {
    serde_json::from_value(envelope.payload().clone()).map_err(|e| ProjectionError::Deserialize {
        aggregate_type: envelope.aggregate_type().to_string(),
        message: e.to_string(),
    })
}
