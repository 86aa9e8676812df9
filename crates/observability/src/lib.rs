//! Tracing/logging setup shared by the server and tools.

pub mod tracing;

pub use crate::tracing::LogFormat;

/// Initialize process-wide logging from the environment.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    crate::tracing::init_with(LogFormat::from_env(), "info");
}
