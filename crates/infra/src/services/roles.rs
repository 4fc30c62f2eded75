//! Role administration and built-in role seeding.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};

use warden_auth::{AuthError, AuthResult, Permission, Role, RoleDraft, RoleUpdate, builtin_roles};
use warden_core::RoleId;

use crate::store::{RoleStore, StoreError, UserStore};

pub struct RoleService {
    roles: Arc<dyn RoleStore>,
    users: Arc<dyn UserStore>,
}

fn name_conflict(name: &str) -> impl FnOnce(StoreError) -> AuthError + '_ {
    move |err| match err {
        StoreError::Conflict(_) => AuthError::DuplicateRoleName(name.to_string()),
        other => other.into(),
    }
}

impl RoleService {
    pub fn new(roles: Arc<dyn RoleStore>, users: Arc<dyn UserStore>) -> Self {
        Self { roles, users }
    }

    /// Insert missing built-in roles and restore `*:*` on the super role.
    pub async fn ensure_builtin_roles(&self) -> AuthResult<()> {
        let now = Utc::now();
        for role in builtin_roles(now) {
            match self.roles.find_by_name(&role.name).await? {
                None => {
                    let name = role.name.clone();
                    match self.roles.insert(role).await {
                        Ok(_) => info!(role = %name, "seeded built-in role"),
                        // Another instance seeded it first.
                        Err(StoreError::Conflict(_)) => {}
                        Err(other) => return Err(other.into()),
                    }
                }
                Some(mut existing) if existing.is_super() && !existing.permissions.has_universal() => {
                    warn!(role = %existing.name, "super role was missing '*:*'; restoring");
                    existing.permissions.insert(Permission::universal());
                    existing.updated_at = now;
                    self.roles.update(existing).await?;
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    pub async fn list(&self) -> AuthResult<Vec<Role>> {
        Ok(self.roles.list().await?)
    }

    pub async fn get(&self, id: RoleId) -> AuthResult<Role> {
        self.roles.get(id).await?.ok_or(AuthError::NotFound("role"))
    }

    /// Absent is `None`; used for audit snapshots.
    pub async fn find(&self, id: RoleId) -> AuthResult<Option<Role>> {
        Ok(self.roles.get(id).await?)
    }

    #[instrument(skip(self, draft), fields(role = %draft.name), err)]
    pub async fn create(&self, draft: RoleDraft) -> AuthResult<Role> {
        let role = draft.into_role(Utc::now())?;
        if self.roles.find_by_name(&role.name).await?.is_some() {
            return Err(AuthError::DuplicateRoleName(role.name));
        }
        let name = role.name.clone();
        let role = self.roles.insert(role).await.map_err(name_conflict(&name))?;
        info!(role_id = %role.id, role = %role.name, "role created");
        Ok(role)
    }

    #[instrument(skip(self, update), fields(role_id = %id), err)]
    pub async fn update(&self, id: RoleId, update: RoleUpdate) -> AuthResult<Role> {
        let mut role = self.get(id).await?;
        if let Some(name) = update.name_change(&role.name) {
            if !role.is_super() && self.roles.find_by_name(&name).await?.is_some() {
                return Err(AuthError::DuplicateRoleName(name));
            }
        }

        update.apply(&mut role, Utc::now())?;
        let name = role.name.clone();
        let role = self.roles.update(role).await.map_err(name_conflict(&name))?;
        info!(role_id = %role.id, role = %role.name, "role updated");
        Ok(role)
    }

    /// Refused for the super role and for any role still assigned to a principal.
    #[instrument(skip(self), fields(role_id = %id), err)]
    pub async fn delete(&self, id: RoleId) -> AuthResult<()> {
        let role = self.get(id).await?;
        role.ensure_deletable()?;

        let assigned = self.users.count_with_role(role.id).await?;
        if assigned > 0 {
            return Err(AuthError::RoleInUse(assigned));
        }

        if !self.roles.delete(role.id).await? {
            return Err(AuthError::NotFound("role"));
        }
        info!(role_id = %role.id, role = %role.name, "role deleted");
        Ok(())
    }
}
