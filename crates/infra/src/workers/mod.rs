//! Background workers.

pub mod retention;

pub use retention::{RetentionConfig, RetentionHandle, RetentionWorker};
