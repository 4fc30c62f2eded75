use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use warden_auth::{AuditFilter, AuditRecord, Role, User};
use warden_core::{AuditId, Page, Pagination, RoleId, UserId};

use super::{AuditStore, RoleStore, StoreError, StoreResult, UserStore};

fn poisoned() -> StoreError {
    StoreError::Backend("lock poisoned".to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// Users
// ─────────────────────────────────────────────────────────────────────────────

/// In-memory principal store.
///
/// Intended for tests/dev. Email uniqueness is checked under the write lock.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<UserId, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `change` to one record under the write lock.
    fn modify(&self, id: UserId, change: impl FnOnce(&mut User)) -> StoreResult<User> {
        let mut users = self.users.write().map_err(|_| poisoned())?;
        let user = users.get_mut(&id).ok_or(StoreError::NotFound("user"))?;
        change(user);
        Ok(user.clone())
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn insert(&self, user: User) -> StoreResult<User> {
        let mut users = self.users.write().map_err(|_| poisoned())?;
        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict(format!("email '{}' already registered", user.email)));
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get(&self, id: UserId) -> StoreResult<Option<User>> {
        let users = self.users.read().map_err(|_| poisoned())?;
        Ok(users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let users = self.users.read().map_err(|_| poisoned())?;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn update_profile(&self, user: User) -> StoreResult<User> {
        let mut users = self.users.write().map_err(|_| poisoned())?;
        if users.values().any(|u| u.id != user.id && u.email == user.email) {
            return Err(StoreError::Conflict(format!("email '{}' already registered", user.email)));
        }
        let stored = users.get_mut(&user.id).ok_or(StoreError::NotFound("user"))?;
        stored.copy_profile_from(&user);
        Ok(stored.clone())
    }

    async fn record_login(&self, id: UserId, at: DateTime<Utc>) -> StoreResult<User> {
        self.modify(id, |u| u.record_login(at))
    }

    async fn set_active(&self, id: UserId, active: bool, at: DateTime<Utc>) -> StoreResult<User> {
        self.modify(id, |u| u.set_active(active, at))
    }

    async fn set_role(&self, id: UserId, role_id: RoleId, at: DateTime<Utc>) -> StoreResult<User> {
        self.modify(id, |u| u.set_role(role_id, at))
    }

    async fn set_reset_token(
        &self,
        id: UserId,
        token: String,
        expires: DateTime<Utc>,
        at: DateTime<Utc>,
    ) -> StoreResult<User> {
        self.modify(id, |u| u.set_reset_token(token, expires, at))
    }

    async fn replace_password_hash(
        &self,
        id: UserId,
        expected: &str,
        hash: String,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<User>> {
        let mut users = self.users.write().map_err(|_| poisoned())?;
        Ok(users.get_mut(&id).filter(|u| u.password_hash == expected).map(|u| {
            u.set_password_hash(hash, at);
            u.clone()
        }))
    }

    async fn redeem_reset_token(
        &self,
        id: UserId,
        token: &str,
        hash: String,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<User>> {
        let mut users = self.users.write().map_err(|_| poisoned())?;
        Ok(users.get_mut(&id).filter(|u| u.reset_token_matches(token, at)).map(|u| {
            u.set_password_hash(hash, at);
            u.clear_reset_token(at);
            u.clone()
        }))
    }

    async fn delete(&self, id: UserId) -> StoreResult<bool> {
        let mut users = self.users.write().map_err(|_| poisoned())?;
        Ok(users.remove(&id).is_some())
    }

    async fn list(&self, pagination: Pagination) -> StoreResult<Page<User>> {
        let users = self.users.read().map_err(|_| poisoned())?;
        let mut all: Vec<User> = users.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.as_uuid().cmp(b.id.as_uuid())));
        Ok(Page::from_vec(all, pagination))
    }

    async fn count_with_role(&self, role_id: RoleId) -> StoreResult<u64> {
        let users = self.users.read().map_err(|_| poisoned())?;
        Ok(users.values().filter(|u| u.role_id == role_id).count() as u64)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Roles
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct InMemoryRoleStore {
    roles: RwLock<HashMap<RoleId, Role>>,
}

impl InMemoryRoleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoleStore for InMemoryRoleStore {
    async fn insert(&self, role: Role) -> StoreResult<Role> {
        let mut roles = self.roles.write().map_err(|_| poisoned())?;
        if roles.values().any(|r| r.name == role.name) {
            return Err(StoreError::Conflict(format!("role name '{}' already taken", role.name)));
        }
        roles.insert(role.id, role.clone());
        Ok(role)
    }

    async fn get(&self, id: RoleId) -> StoreResult<Option<Role>> {
        let roles = self.roles.read().map_err(|_| poisoned())?;
        Ok(roles.get(&id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> StoreResult<Option<Role>> {
        let roles = self.roles.read().map_err(|_| poisoned())?;
        Ok(roles.values().find(|r| r.name == name).cloned())
    }

    async fn update(&self, role: Role) -> StoreResult<Role> {
        let mut roles = self.roles.write().map_err(|_| poisoned())?;
        if !roles.contains_key(&role.id) {
            return Err(StoreError::NotFound("role"));
        }
        if roles.values().any(|r| r.id != role.id && r.name == role.name) {
            return Err(StoreError::Conflict(format!("role name '{}' already taken", role.name)));
        }
        roles.insert(role.id, role.clone());
        Ok(role)
    }

    async fn delete(&self, id: RoleId) -> StoreResult<bool> {
        let mut roles = self.roles.write().map_err(|_| poisoned())?;
        Ok(roles.remove(&id).is_some())
    }

    async fn list(&self) -> StoreResult<Vec<Role>> {
        let roles = self.roles.read().map_err(|_| poisoned())?;
        let mut all: Vec<Role> = roles.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Audit
// ─────────────────────────────────────────────────────────────────────────────

/// Append-only in-memory audit log.
#[derive(Debug, Default)]
pub struct InMemoryAuditStore {
    records: RwLock<Vec<AuditRecord>>,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn append(&self, record: AuditRecord) -> StoreResult<()> {
        let mut records = self.records.write().map_err(|_| poisoned())?;
        records.push(record);
        Ok(())
    }

    async fn get(&self, id: AuditId) -> StoreResult<Option<AuditRecord>> {
        let records = self.records.read().map_err(|_| poisoned())?;
        Ok(records.iter().find(|r| r.id == id).cloned())
    }

    async fn query(&self, filter: &AuditFilter, pagination: Pagination) -> StoreResult<Page<AuditRecord>> {
        let records = self.records.read().map_err(|_| poisoned())?;
        let mut matching: Vec<AuditRecord> = records.iter().filter(|r| filter.matches(r)).cloned().collect();
        // v7 ids break ties between records sharing a timestamp.
        matching.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.as_uuid().cmp(a.id.as_uuid()))
        });
        Ok(Page::from_vec(matching, pagination))
    }

    async fn purge_before(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        let mut records = self.records.write().map_err(|_| poisoned())?;
        let before = records.len();
        records.retain(|r| r.created_at >= cutoff);
        Ok((before - records.len()) as u64)
    }
}
