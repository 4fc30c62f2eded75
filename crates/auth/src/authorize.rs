//! Authorization decision seam.
//!
//! The gate in front of protected operations depends on
//! [`PermissionEvaluator`] rather than on free functions so callers can inject
//! it; the default [`RbacEvaluator`] is stateless.

use warden_core::UserId;

use crate::{AuthError, Permission, PermissionSet, Principal, permissions};

pub trait PermissionEvaluator: Send + Sync {
    fn has_permission(&self, granted: &PermissionSet, required: &Permission) -> bool;

    fn can_access_resource(&self, principal: &Principal, owner_id: UserId, required: &Permission) -> bool;
}

/// Role-based evaluator with wildcard and `:self` semantics.
#[derive(Debug, Clone, Copy, Default)]
pub struct RbacEvaluator;

impl PermissionEvaluator for RbacEvaluator {
    fn has_permission(&self, granted: &PermissionSet, required: &Permission) -> bool {
        permissions::has_permission(granted, required)
    }

    fn can_access_resource(&self, principal: &Principal, owner_id: UserId, required: &Permission) -> bool {
        permissions::can_access_resource(principal, owner_id, required)
    }
}

/// Authorize a principal for `required`, optionally against a resource owner.
///
/// - No IO
/// - No panics
/// - Rejection names the missing permission
pub fn authorize(
    evaluator: &dyn PermissionEvaluator,
    principal: &Principal,
    required: &Permission,
    owner_id: Option<UserId>,
) -> Result<(), AuthError> {
    let allowed = match owner_id {
        Some(owner) => evaluator.can_access_resource(principal, owner, required),
        None => evaluator.has_permission(&principal.permissions, required),
    };

    if allowed {
        Ok(())
    } else {
        Err(AuthError::InsufficientPermission(required.to_string()))
    }
}
