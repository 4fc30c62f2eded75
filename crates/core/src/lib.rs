//! `warden-core`: identity and paging primitives shared by every layer.
//!
//! This crate contains no I/O and no security policy.

pub mod error;
pub mod id;
pub mod page;

pub use error::{DomainError, DomainResult};
pub use id::{AuditId, RoleId, UserId};
pub use page::{Page, Pagination};
