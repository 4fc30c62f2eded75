//! Shared fixtures for the service tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use warden_auth::{
    AuditAction, AuditFilter, AuditRecord, PasswordHasher, Registration, TokenConfig, TokenIssuer, User,
};
use warden_core::{Page, Pagination, RoleId, UserId};

use crate::audit::{AuditInterceptor, AuditWriter};
use crate::notify::RecordingResetNotifier;
use crate::services::{AuditLogService, RoleService, SessionManager, UserService};
use crate::store::{
    InMemoryAuditStore, InMemoryRoleStore, InMemoryUserStore, StoreResult, Stores, UserStore,
};

pub(crate) fn registration(email: &str) -> Registration {
    Registration {
        first_name: "Ada".into(),
        last_name: "Lovelace".into(),
        email: email.into(),
        password: "correct-horse".into(),
        role_id: None,
    }
}

pub(crate) struct Harness {
    pub stores: Stores,
    pub issuer: Arc<TokenIssuer>,
    pub notifier: Arc<RecordingResetNotifier>,
    pub interceptor: AuditInterceptor,
    pub sessions: SessionManager,
    pub users: UserService,
    pub roles: RoleService,
    pub audit_log: AuditLogService,
}

impl Harness {
    /// In-memory stores with the built-in roles seeded.
    pub async fn new() -> Self {
        Self::with_users(Arc::new(InMemoryUserStore::new())).await
    }

    /// Like [`new`](Self::new) with a caller-supplied user store.
    pub async fn with_users(users: Arc<dyn UserStore>) -> Self {
        let stores = Stores {
            users,
            roles: Arc::new(InMemoryRoleStore::new()),
            audit: Arc::new(InMemoryAuditStore::new()),
        };
        let issuer = Arc::new(TokenIssuer::new(TokenConfig::new("test-access-secret", "test-refresh-secret")).unwrap());
        let hasher = PasswordHasher::min_cost();
        let writer = AuditWriter::new(stores.audit.clone());
        let notifier = Arc::new(RecordingResetNotifier::new());

        let roles = RoleService::new(stores.roles.clone(), stores.users.clone());
        roles.ensure_builtin_roles().await.unwrap();

        Self {
            sessions: SessionManager::new(
                stores.users.clone(),
                stores.roles.clone(),
                issuer.clone(),
                hasher,
                writer.clone(),
                notifier.clone(),
            ),
            users: UserService::new(stores.users.clone(), stores.roles.clone(), hasher),
            audit_log: AuditLogService::new(stores.audit.clone()),
            interceptor: AuditInterceptor::new(writer),
            roles,
            stores,
            issuer,
            notifier,
        }
    }

    pub async fn audit_records(&self, action: AuditAction) -> Vec<AuditRecord> {
        let filter = AuditFilter {
            action: Some(action),
            ..Default::default()
        };
        self.stores
            .audit
            .query(&filter, Pagination::new(Some(1), Some(100)))
            .await
            .unwrap()
            .items
    }
}

/// A write by another request, landing between a service's read and its own write.
#[derive(Debug, Clone)]
pub(crate) enum ConcurrentWrite {
    Deactivate,
    SetRole(RoleId),
    SetPasswordHash(String),
    RedeemResetToken { token: String, hash: String },
}

/// In-memory user store that applies one armed [`ConcurrentWrite`] right
/// after handing out a record from `get` or `find_by_email`, leaving the
/// caller with a stale copy.
#[derive(Default)]
pub(crate) struct InterleavingUserStore {
    inner: InMemoryUserStore,
    armed: Mutex<Option<ConcurrentWrite>>,
}

impl InterleavingUserStore {
    pub fn arm(&self, write: ConcurrentWrite) {
        *self.armed.lock().unwrap() = Some(write);
    }

    async fn interleave(&self, read: Option<User>) -> StoreResult<Option<User>> {
        if let Some(user) = &read {
            let pending = self.armed.lock().unwrap().take();
            let now = Utc::now();
            match pending {
                Some(ConcurrentWrite::Deactivate) => {
                    self.inner.set_active(user.id, false, now).await?;
                }
                Some(ConcurrentWrite::SetRole(role_id)) => {
                    self.inner.set_role(user.id, role_id, now).await?;
                }
                Some(ConcurrentWrite::SetPasswordHash(hash)) => {
                    self.inner
                        .replace_password_hash(user.id, &user.password_hash, hash, now)
                        .await?;
                }
                Some(ConcurrentWrite::RedeemResetToken { token, hash }) => {
                    self.inner.redeem_reset_token(user.id, &token, hash, now).await?;
                }
                None => {}
            }
        }
        Ok(read)
    }
}

#[async_trait]
impl UserStore for InterleavingUserStore {
    async fn insert(&self, user: User) -> StoreResult<User> {
        self.inner.insert(user).await
    }

    async fn get(&self, id: UserId) -> StoreResult<Option<User>> {
        let read = self.inner.get(id).await?;
        self.interleave(read).await
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let read = self.inner.find_by_email(email).await?;
        self.interleave(read).await
    }

    async fn update_profile(&self, user: User) -> StoreResult<User> {
        self.inner.update_profile(user).await
    }

    async fn record_login(&self, id: UserId, at: DateTime<Utc>) -> StoreResult<User> {
        self.inner.record_login(id, at).await
    }

    async fn set_active(&self, id: UserId, active: bool, at: DateTime<Utc>) -> StoreResult<User> {
        self.inner.set_active(id, active, at).await
    }

    async fn set_role(&self, id: UserId, role_id: RoleId, at: DateTime<Utc>) -> StoreResult<User> {
        self.inner.set_role(id, role_id, at).await
    }

    async fn set_reset_token(
        &self,
        id: UserId,
        token: String,
        expires: DateTime<Utc>,
        at: DateTime<Utc>,
    ) -> StoreResult<User> {
        self.inner.set_reset_token(id, token, expires, at).await
    }

    async fn replace_password_hash(
        &self,
        id: UserId,
        expected: &str,
        hash: String,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<User>> {
        self.inner.replace_password_hash(id, expected, hash, at).await
    }

    async fn redeem_reset_token(
        &self,
        id: UserId,
        token: &str,
        hash: String,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<User>> {
        self.inner.redeem_reset_token(id, token, hash, at).await
    }

    async fn delete(&self, id: UserId) -> StoreResult<bool> {
        self.inner.delete(id).await
    }

    async fn list(&self, pagination: Pagination) -> StoreResult<Page<User>> {
        self.inner.list(pagination).await
    }

    async fn count_with_role(&self, role_id: RoleId) -> StoreResult<u64> {
        self.inner.count_with_role(role_id).await
    }
}
