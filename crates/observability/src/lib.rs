//! Tracing and logging setup shared by binaries and tests.

/// Initialize process-wide tracing with the default filter.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    tracing::init(tracing::DEFAULT_FILTER);
}

pub mod tracing;
