//! Domain error model.

use thiserror::Error;

/// Result type used by value constructors across the workspace.
pub type DomainResult<T> = Result<T, DomainError>;

/// Construction-time failure of a domain value.
///
/// Policy failures (credentials, permissions, protected roles) are not modelled
/// here; they belong to `warden-auth`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed permission string).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}
