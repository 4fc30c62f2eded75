//! Infrastructure layer: record stores, audit trail, application services and
//! background workers.

pub mod audit;
pub mod notify;
pub mod services;
pub mod store;
pub mod workers;

#[cfg(test)]
mod testkit;

pub use audit::{AuditDescriptor, AuditInterceptor, AuditWriter, RequestMeta};
pub use notify::{LogResetNotifier, RecordingResetNotifier, ResetNotifier};
pub use services::{AuditLogService, AuthSession, CurrentUser, RoleService, RoleSummary, SessionManager, UserService};
pub use store::{AuditStore, RoleStore, StoreError, StoreResult, Stores, UserStore};
pub use workers::{RetentionConfig, RetentionWorker};
