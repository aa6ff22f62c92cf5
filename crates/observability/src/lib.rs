//! Tracing/logging setup shared by the karatbook binaries.

/// Initialize process-wide logging with JSON output at `info`.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    crate::tracing::init_with(LogFormat::Json, "info");
}

/// Tracing configuration (filters, formats).
pub mod tracing;

pub use crate::tracing::{LogFormat, ParseLogFormatError, init_with};
