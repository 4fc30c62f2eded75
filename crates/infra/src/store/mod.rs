//! Record store boundary.
//!
//! Three async traits cover the collections the core persists: principals,
//! roles and audit records. Backends: [`memory`] for tests/dev and
//! [`postgres`] for deployments.
//!
//! Uniqueness (user email, role name) is enforced by the backend and surfaces
//! as [`StoreError::Conflict`]; callers translate it into the domain error that
//! fits the operation.

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use warden_auth::{AuditFilter, AuditRecord, AuthError, Role, User};
use warden_core::{AuditId, Page, Pagination, RoleId, UserId};

pub use memory::{InMemoryAuditStore, InMemoryRoleStore, InMemoryUserStore};
pub use postgres::{PostgresAuditStore, PostgresRoleStore, PostgresUserStore};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A unique key is already taken.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("store backend error: {0}")]
    Backend(String),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => AuthError::NotFound(what),
            StoreError::Conflict(msg) => AuthError::internal(format!("unexpected conflict: {msg}")),
            StoreError::Backend(msg) => AuthError::internal(msg),
        }
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new principal. `Conflict` when the email is taken.
    async fn insert(&self, user: User) -> StoreResult<User>;

    async fn get(&self, id: UserId) -> StoreResult<Option<User>>;

    /// Lookup by normalized email.
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Write the profile columns of `user` (names, email, phone, bio, avatar).
    /// Credentials, status, role and login time keep their stored values.
    /// `NotFound` if absent, `Conflict` on email clash.
    async fn update_profile(&self, user: User) -> StoreResult<User>;

    /// `NotFound` if absent.
    async fn record_login(&self, id: UserId, at: DateTime<Utc>) -> StoreResult<User>;

    async fn set_active(&self, id: UserId, active: bool, at: DateTime<Utc>) -> StoreResult<User>;

    async fn set_role(&self, id: UserId, role_id: RoleId, at: DateTime<Utc>) -> StoreResult<User>;

    /// Store a reset token, superseding any earlier one.
    async fn set_reset_token(
        &self,
        id: UserId,
        token: String,
        expires: DateTime<Utc>,
        at: DateTime<Utc>,
    ) -> StoreResult<User>;

    /// Swap the password hash only while it still equals `expected`.
    /// `None` when the record is gone or its hash changed in between.
    async fn replace_password_hash(
        &self,
        id: UserId,
        expected: &str,
        hash: String,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<User>>;

    /// Set `hash` and clear the reset token in one step, provided `token` is
    /// still the stored one and unexpired at `at`. `None` otherwise, so a
    /// token is redeemed at most once.
    async fn redeem_reset_token(
        &self,
        id: UserId,
        token: &str,
        hash: String,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<User>>;

    /// Returns whether a record was removed.
    async fn delete(&self, id: UserId) -> StoreResult<bool>;

    /// Oldest first.
    async fn list(&self, pagination: Pagination) -> StoreResult<Page<User>>;

    async fn count_with_role(&self, role_id: RoleId) -> StoreResult<u64>;
}

#[async_trait]
pub trait RoleStore: Send + Sync {
    /// `Conflict` when the name is taken.
    async fn insert(&self, role: Role) -> StoreResult<Role>;

    async fn get(&self, id: RoleId) -> StoreResult<Option<Role>>;

    async fn find_by_name(&self, name: &str) -> StoreResult<Option<Role>>;

    /// `NotFound` if absent, `Conflict` on name clash.
    async fn update(&self, role: Role) -> StoreResult<Role>;

    async fn delete(&self, id: RoleId) -> StoreResult<bool>;

    /// Ordered by name.
    async fn list(&self) -> StoreResult<Vec<Role>>;
}

/// Append-only audit log. There is no update operation.
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append(&self, record: AuditRecord) -> StoreResult<()>;

    async fn get(&self, id: AuditId) -> StoreResult<Option<AuditRecord>>;

    /// Newest first.
    async fn query(&self, filter: &AuditFilter, pagination: Pagination) -> StoreResult<Page<AuditRecord>>;

    /// Delete records created strictly before `cutoff`; returns how many went.
    async fn purge_before(&self, cutoff: DateTime<Utc>) -> StoreResult<u64>;
}

/// The three stores, shared behind trait objects.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub roles: Arc<dyn RoleStore>,
    pub audit: Arc<dyn AuditStore>,
}

impl Stores {
    pub fn in_memory() -> Self {
        Self {
            users: Arc::new(InMemoryUserStore::new()),
            roles: Arc::new(InMemoryRoleStore::new()),
            audit: Arc::new(InMemoryAuditStore::new()),
        }
    }

    pub fn postgres(pool: sqlx::PgPool) -> Self {
        Self {
            users: Arc::new(PostgresUserStore::new(pool.clone())),
            roles: Arc::new(PostgresRoleStore::new(pool.clone())),
            audit: Arc::new(PostgresAuditStore::new(pool)),
        }
    }
}
