//! Role record model and the protected built-in roles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use warden_core::RoleId;

use crate::{AuthError, AuthResult, FieldError, Permission, PermissionSet};

/// Distinguished role that always holds `*:*`. Never renamed or deleted.
pub const SUPER_ROLE_NAME: &str = "super-admin";

/// Role assigned on self-registration when none is requested.
pub const DEFAULT_ROLE_NAME: &str = "user";

const MAX_ROLE_NAME_LEN: usize = 50;

/// Trimmed, lower-cased form used for storage and uniqueness.
pub fn normalize_role_name(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn validate_role_name(name: &str) -> Result<(), FieldError> {
    if name.is_empty() {
        return Err(FieldError::new("name", "must not be empty"));
    }
    if name.chars().count() > MAX_ROLE_NAME_LEN {
        return Err(FieldError::new("name", format!("must be at most {MAX_ROLE_NAME_LEN} characters")));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        return Err(FieldError::new("name", "may only contain letters, digits, '-' and '_'"));
    }
    Ok(())
}

fn parse_permissions(raw: &[String]) -> Result<PermissionSet, FieldError> {
    PermissionSet::parse_all(raw).map_err(|e| FieldError::new("permissions", e.to_string()))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub description: String,
    pub permissions: PermissionSet,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Role {
    pub fn new(name: &str, description: &str, permissions: PermissionSet, now: DateTime<Utc>) -> Self {
        Self {
            id: RoleId::new(),
            name: normalize_role_name(name),
            description: description.trim().to_string(),
            permissions,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_super(&self) -> bool {
        self.name == SUPER_ROLE_NAME
    }

    /// Roles that grant everything cannot be chosen at self-registration;
    /// they are only handed out through role assignment.
    pub fn ensure_self_assignable(&self) -> AuthResult<()> {
        if self.is_super() || self.permissions.has_universal() {
            return Err(AuthError::ProtectedRoleViolation(format!(
                "role '{}' cannot be chosen at registration",
                self.name
            )));
        }
        Ok(())
    }

    /// The super role cannot be deleted. Assignment counts are checked by the caller.
    pub fn ensure_deletable(&self) -> AuthResult<()> {
        if self.is_super() {
            return Err(AuthError::ProtectedRoleViolation(format!(
                "'{SUPER_ROLE_NAME}' cannot be deleted"
            )));
        }
        Ok(())
    }
}

/// The roles every deployment starts with.
pub fn builtin_roles(now: DateTime<Utc>) -> Vec<Role> {
    let mut admin = PermissionSet::new();
    admin.insert(Permission::universal());

    let user = [Permission::parse("users:read:self"), Permission::parse("users:update:self")]
        .into_iter()
        .flatten()
        .collect();

    vec![
        Role::new(SUPER_ROLE_NAME, "Unrestricted administrator", admin, now),
        Role::new(DEFAULT_ROLE_NAME, "Self-service access to own profile", user, now),
    ]
}

/// Input for creating a role.
#[derive(Debug, Clone, Deserialize)]
pub struct RoleDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl RoleDraft {
    /// Validate and build the role. Name uniqueness is the store's concern.
    pub fn into_role(self, now: DateTime<Utc>) -> AuthResult<Role> {
        let name = normalize_role_name(&self.name);
        let mut errors = Vec::new();
        errors.extend(validate_role_name(&name).err());
        let permissions = match parse_permissions(&self.permissions) {
            Ok(set) => set,
            Err(e) => {
                errors.push(e);
                PermissionSet::new()
            }
        };
        if !errors.is_empty() {
            return Err(AuthError::Validation(errors));
        }
        Ok(Role::new(&name, &self.description, permissions, now))
    }
}

/// Partial role change.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoleUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub permissions: Option<Vec<String>>,
}

impl RoleUpdate {
    /// Normalized new name, if the update renames the role.
    pub fn name_change(&self, current: &str) -> Option<String> {
        self.name
            .as_deref()
            .map(normalize_role_name)
            .filter(|name| name != current)
    }

    /// Validate and apply to `role`, refusing to weaken the super role.
    pub fn apply(self, role: &mut Role, now: DateTime<Utc>) -> AuthResult<()> {
        let new_name = self.name_change(&role.name);
        let mut errors = Vec::new();
        if let Some(name) = &new_name {
            errors.extend(validate_role_name(name).err());
        }
        let permissions = match self.permissions.as_deref().map(parse_permissions) {
            Some(Ok(set)) => Some(set),
            Some(Err(e)) => {
                errors.push(e);
                None
            }
            None => None,
        };
        if !errors.is_empty() {
            return Err(AuthError::Validation(errors));
        }

        if role.is_super() {
            if new_name.is_some() {
                return Err(AuthError::ProtectedRoleViolation(format!(
                    "'{SUPER_ROLE_NAME}' cannot be renamed"
                )));
            }
            if permissions.as_ref().is_some_and(|p| !p.has_universal()) {
                return Err(AuthError::ProtectedRoleViolation(format!(
                    "'{SUPER_ROLE_NAME}' must keep '*:*'"
                )));
            }
        }

        if let Some(name) = new_name {
            role.name = name;
        }
        if let Some(description) = self.description {
            role.description = description.trim().to_string();
        }
        if let Some(permissions) = permissions {
            role.permissions = permissions;
        }
        role.updated_at = now;
        Ok(())
    }
}
