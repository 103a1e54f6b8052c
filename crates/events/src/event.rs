use chrono::{DateTime, Utc};

use stocklink_core::Actor;

/// A domain event: an immutable, versioned fact.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name/type identifier (e.g. "transfers.order.submitted").
    fn event_type(&self) -> &'static str;

    /// Schema version for this event type.
    fn version(&self) -> u32;

    /// When the event occurred (business time).
    fn occurred_at(&self) -> DateTime<Utc>;

    /// The user who caused the event, if any.
    fn actor(&self) -> Option<&Actor> {
        None
    }
}
