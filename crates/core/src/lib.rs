//! `stocklink-core`: pure domain primitives shared by every stocklink crate.
//!
//! - [`Aggregate`] / [`AggregateRoot`]: the decide/apply contract that the
//!   command dispatcher drives, plus [`ExpectedVersion`] for optimistic appends.
//! - [`DomainError`]: deterministic business failures, mapped to HTTP statuses
//!   at the API edge.
//! - [`AggregateId`] / [`UserId`]: UUID-backed identifiers; numbered transfer
//!   orders use sequence-backed aggregate ids.
//! - [`Actor`]: the user recorded on events and audit entries.
//!
//! No IO, no clocks, no logging.

pub mod actor;
pub mod aggregate;
pub mod error;
pub mod id;

pub use actor::Actor;
pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use error::{DomainError, DomainResult};
pub use id::{AggregateId, UserId};
