//! `stocklink-reports` — transfer order reports.
//!
//! Query semantics ([`query_orders`]) and PDF rendering ([`render_pdf`]) are
//! pure functions over order views; loading the views is the caller's job.

pub mod error;
pub mod filter;
pub mod layout;
pub mod pdf;

pub use error::ReportError;
pub use filter::{LocalTime, ReportFilter, ReportMode, query_orders};
pub use layout::{Element, OperatorField, Page, ReportKind, paginate};
pub use pdf::render_pdf;
