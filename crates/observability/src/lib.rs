//! Tracing and logging setup shared by every entry point.

/// Tracing configuration (filters, output format).
pub mod tracing;

pub use crate::tracing::LogConfig;

/// Initialize process-wide tracing/logging.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init(config: &LogConfig) {
    crate::tracing::init(config);
}
