//! Application services: the session lifecycle plus user, role and audit-log
//! administration. Services speak [`AuthError`]; store errors are translated
//! here.

pub mod audit_log;
pub mod roles;
pub mod session;
pub mod users;

pub use audit_log::AuditLogService;
pub use roles::RoleService;
pub use session::{AuthSession, SessionManager};
pub use users::{CurrentUser, RoleSummary, UserService};

use warden_auth::{AuthError, AuthResult, PasswordHasher, Role};
use warden_core::RoleId;

use crate::store::RoleStore;

/// bcrypt on the blocking pool.
pub(crate) async fn hash_password(hasher: PasswordHasher, password: String) -> AuthResult<String> {
    tokio::task::spawn_blocking(move || hasher.hash(&password))
        .await
        .map_err(|e| AuthError::internal(format!("password hashing task failed: {e}")))?
}

/// bcrypt verification on the blocking pool.
pub(crate) async fn verify_password(hasher: PasswordHasher, password: String, hash: String) -> AuthResult<bool> {
    tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
        .await
        .map_err(|e| AuthError::internal(format!("password verification task failed: {e}")))
}

/// The role a stored principal points at. A dangling reference is an internal fault.
pub(crate) async fn role_of(roles: &dyn RoleStore, role_id: RoleId) -> AuthResult<Role> {
    roles
        .get(role_id)
        .await?
        .ok_or_else(|| AuthError::internal(format!("principal references missing role {role_id}")))
}
