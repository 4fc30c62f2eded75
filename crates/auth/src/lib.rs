//! `warden-auth`: pure authentication/authorization core.
//!
//! This crate is intentionally decoupled from HTTP and storage: permission
//! evaluation, credential minting/verification, password hashing and the
//! record models the stores persist.

pub mod audit;
pub mod authorize;
pub mod claims;
pub mod error;
pub mod password;
pub mod permissions;
pub mod principal;
pub mod roles;
pub mod tokens;
pub mod user;

pub use audit::{AuditAction, AuditFilter, AuditRecord, ResourceKind, scrub_secrets};
pub use authorize::{PermissionEvaluator, RbacEvaluator, authorize};
pub use claims::{AccessClaims, PasswordResetClaims, RefreshClaims, TokenKind};
pub use error::{AuthError, AuthResult, FieldError};
pub use password::{MAX_PASSWORD_BYTES, MIN_PASSWORD_LEN, PasswordHasher, validate_password};
pub use permissions::{Permission, PermissionSet, Segment, can_access_resource, has_permission, has_permission_str};
pub use principal::Principal;
pub use roles::{DEFAULT_ROLE_NAME, Role, RoleDraft, RoleUpdate, SUPER_ROLE_NAME, builtin_roles, normalize_role_name};
pub use tokens::{TokenConfig, TokenConfigError, TokenIssuer, TokenPair};
pub use user::{ProfileUpdate, Registration, User, UserProfile, normalize_email};
