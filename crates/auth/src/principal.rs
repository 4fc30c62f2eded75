use serde::{Deserialize, Serialize};

use warden_core::{RoleId, UserId};

use crate::{AccessClaims, PermissionSet, Role, User};

/// A fully resolved principal for authorization decisions.
///
/// Built either from storage (user + role, at credential issuance) or from a
/// verified access credential (per request). Holds a copy of the role's
/// permissions as they were when resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: UserId,
    pub email: String,
    pub role_id: RoleId,
    pub permissions: PermissionSet,
}

impl Principal {
    pub fn resolve(user: &User, role: &Role) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            role_id: role.id,
            permissions: role.permissions.clone(),
        }
    }
}

impl From<AccessClaims> for Principal {
    fn from(claims: AccessClaims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
            role_id: claims.role_id,
            permissions: claims.permissions,
        }
    }
}
