//! Principal administration.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, instrument};

use warden_auth::{
    AuthError, AuthResult, PasswordHasher, ProfileUpdate, SUPER_ROLE_NAME, User, UserProfile, normalize_email,
    validate_password,
};
use warden_core::{Page, Pagination, RoleId, UserId};

use super::{hash_password, role_of};
use crate::store::{RoleStore, StoreError, UserStore};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleSummary {
    pub id: RoleId,
    pub name: String,
}

/// Profile of the caller with their role's current permissions.
#[derive(Debug, Clone, Serialize)]
pub struct CurrentUser {
    #[serde(flatten)]
    pub user: UserProfile,
    pub role: RoleSummary,
    pub permissions: Vec<String>,
}

pub struct UserService {
    users: Arc<dyn UserStore>,
    roles: Arc<dyn RoleStore>,
    hasher: PasswordHasher,
}

fn email_conflict(err: StoreError) -> AuthError {
    match err {
        StoreError::Conflict(_) => AuthError::DuplicateEmail,
        other => other.into(),
    }
}

impl UserService {
    pub fn new(users: Arc<dyn UserStore>, roles: Arc<dyn RoleStore>, hasher: PasswordHasher) -> Self {
        Self { users, roles, hasher }
    }

    async fn load(&self, id: UserId) -> AuthResult<User> {
        self.users.get(id).await?.ok_or(AuthError::NotFound("user"))
    }

    pub async fn me(&self, id: UserId) -> AuthResult<CurrentUser> {
        let user = self.load(id).await?;
        let role = role_of(self.roles.as_ref(), user.role_id).await?;
        Ok(CurrentUser {
            user: user.profile(),
            role: RoleSummary {
                id: role.id,
                name: role.name,
            },
            permissions: role.permissions.to_strings(),
        })
    }

    pub async fn list(&self, pagination: Pagination) -> AuthResult<Page<UserProfile>> {
        Ok(self.users.list(pagination).await?.map(|u| u.profile()))
    }

    pub async fn get(&self, id: UserId) -> AuthResult<UserProfile> {
        Ok(self.load(id).await?.profile())
    }

    /// Like [`get`](Self::get) but absent is `None`; used for audit snapshots.
    pub async fn find(&self, id: UserId) -> AuthResult<Option<UserProfile>> {
        Ok(self.users.get(id).await?.map(|u| u.profile()))
    }

    #[instrument(skip(self, update), fields(user_id = %id), err)]
    pub async fn update_profile(&self, id: UserId, update: ProfileUpdate) -> AuthResult<UserProfile> {
        update.validate()?;
        let mut user = self.load(id).await?;

        if let Some(email) = update.email_change(&user.email) {
            if self.users.find_by_email(&email).await?.is_some() {
                return Err(AuthError::DuplicateEmail);
            }
        }

        update.apply(&mut user, Utc::now());
        let user = self.users.update_profile(user).await.map_err(email_conflict)?;
        Ok(user.profile())
    }

    #[instrument(skip(self), fields(user_id = %id, role_id = %role_id), err)]
    pub async fn assign_role(&self, id: UserId, role_id: RoleId) -> AuthResult<UserProfile> {
        self.load(id).await?;
        let role = self.roles.get(role_id).await?.ok_or(AuthError::NotFound("role"))?;
        let user = self.users.set_role(id, role.id, Utc::now()).await?;
        info!(user_id = %user.id, role = %role.name, "role assigned");
        Ok(user.profile())
    }

    #[instrument(skip(self), fields(user_id = %id), err)]
    pub async fn set_active(&self, id: UserId, active: bool) -> AuthResult<UserProfile> {
        let user = self.users.set_active(id, active, Utc::now()).await?;
        info!(user_id = %user.id, active, "account status changed");
        Ok(user.profile())
    }

    /// Hard delete. An actor may not delete their own account.
    #[instrument(skip(self), fields(actor = %actor, user_id = %id), err)]
    pub async fn delete(&self, actor: UserId, id: UserId) -> AuthResult<()> {
        if actor == id {
            return Err(AuthError::SelfDeletionForbidden);
        }
        if !self.users.delete(id).await? {
            return Err(AuthError::NotFound("user"));
        }
        info!(user_id = %id, "user deleted");
        Ok(())
    }

    /// Create the configured administrator unless that email already exists.
    ///
    /// Returns the new profile, or `None` when nothing was created.
    #[instrument(skip(self, password), err)]
    pub async fn bootstrap_admin(&self, email: &str, password: String) -> AuthResult<Option<UserProfile>> {
        let email = normalize_email(email);
        if self.users.find_by_email(&email).await?.is_some() {
            return Ok(None);
        }
        validate_password("password", &password).map_err(|e| AuthError::Validation(vec![e]))?;

        let role = self
            .roles
            .find_by_name(SUPER_ROLE_NAME)
            .await?
            .ok_or_else(|| AuthError::internal(format!("role '{SUPER_ROLE_NAME}' is missing")))?;
        let hash = hash_password(self.hasher, password).await?;
        let user = User::new("System", "Administrator", &email, hash, role.id, Utc::now());
        let user = self.users.insert(user).await.map_err(email_conflict)?;

        info!(user_id = %user.id, "bootstrap administrator created");
        Ok(Some(user.profile()))
    }
}
