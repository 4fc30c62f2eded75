use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

use warden_auth::{AuthError, FieldError};
use warden_core::DomainError;

use crate::app::dto::ApiResponse;

/// Everything a handler can fail with.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Body, query or path could not be decoded.
    #[error("{0}")]
    BadRequest(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Auth(err) => auth_status(err),
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

fn auth_status(err: &AuthError) -> StatusCode {
    match err {
        AuthError::InvalidCredentials
        | AuthError::AccountInactive
        | AuthError::InvalidToken
        | AuthError::TokenPurposeMismatch => StatusCode::UNAUTHORIZED,
        AuthError::InsufficientPermission(_)
        | AuthError::ProtectedRoleViolation(_)
        | AuthError::SelfDeletionForbidden => StatusCode::FORBIDDEN,
        AuthError::NotFound(_) => StatusCode::NOT_FOUND,
        AuthError::DuplicateEmail | AuthError::DuplicateRoleName(_) | AuthError::RoleInUse(_) => {
            StatusCode::CONFLICT
        }
        AuthError::Validation(_) => StatusCode::BAD_REQUEST,
        AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::Auth(AuthError::Validation(errors)) => ApiResponse::<()>::failure("validation failed", errors),
            ApiError::Auth(AuthError::Internal(detail)) => {
                error!(error = %detail, "request failed with internal error");
                ApiResponse::failure("internal server error", Vec::new())
            }
            other => ApiResponse::failure(other.to_string(), Vec::new()),
        };
        (status, body).into_response()
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// Single-field validation failure.
pub fn invalid_field(field: &str, message: &str) -> ApiError {
    ApiError::Auth(AuthError::Validation(vec![FieldError::new(field, message)]))
}
