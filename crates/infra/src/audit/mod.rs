//! Audit trail: a best-effort writer and the success-gated interceptor.

pub mod interceptor;
pub mod writer;

pub use interceptor::{AuditDescriptor, AuditInterceptor, RequestMeta, ResourceIdExtractor};
pub use writer::AuditWriter;
