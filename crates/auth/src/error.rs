use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;

/// A single input problem, reported back as `{field, message}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Authentication/authorization failure taxonomy.
///
/// Authentication variants carry no detail about *why* they failed; the
/// authorization variant names the missing permission.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("account is deactivated")]
    AccountInactive,

    #[error("invalid or expired token")]
    InvalidToken,

    #[error("token cannot be used for this purpose")]
    TokenPurposeMismatch,

    #[error("forbidden: missing permission '{0}'")]
    InsufficientPermission(String),

    #[error("email is already registered")]
    DuplicateEmail,

    #[error("role name '{0}' is already taken")]
    DuplicateRoleName(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("protected role: {0}")]
    ProtectedRoleViolation(String),

    #[error("role is still assigned to {0} user(s)")]
    RoleInUse(u64),

    #[error("you cannot delete your own account")]
    SelfDeletionForbidden,

    #[error("validation failed")]
    Validation(Vec<FieldError>),

    /// Unexpected fault (store outage, signing failure). Never shown verbatim to callers.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(vec![FieldError::new(field, message)])
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// True for the variants that must stay uninformative towards the caller.
    pub fn is_authentication_failure(&self) -> bool {
        matches!(
            self,
            AuthError::InvalidCredentials
                | AuthError::AccountInactive
                | AuthError::InvalidToken
                | AuthError::TokenPurposeMismatch
        )
    }
}
