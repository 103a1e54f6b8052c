//! Process-wide tracing setup shared by the binaries.

/// Initialize structured logging with `info` as the default level.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    tracing::init("info");
}

/// Tracing configuration (filters, layers).
pub mod tracing;
