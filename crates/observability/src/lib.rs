//! Tracing and logging setup shared by the binaries.

/// Initialize process-wide logging using `LOG_FORMAT` (`json` or `pretty`).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init(tracing::LogFormat::from_env());
}

/// Tracing configuration (filters, layers).
pub mod tracing;

pub use tracing::LogFormat;
