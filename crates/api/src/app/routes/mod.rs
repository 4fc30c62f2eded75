use std::sync::Arc;

use axum::Router;

use warden_auth::PermissionEvaluator;

use crate::app::errors::ApiError;

pub mod audit;
pub mod auth;
pub mod roles;
pub mod system;
pub mod users;

pub type ApiResult<T> = Result<T, ApiError>;

/// Router for all endpoints behind the bearer middleware.
pub fn router(evaluator: Arc<dyn PermissionEvaluator>) -> Router {
    Router::new()
        .merge(auth::protected_router())
        .nest("/users", users::router(evaluator.clone()))
        .nest("/roles", roles::router(evaluator.clone()))
        .nest("/audit-logs", audit::router(evaluator))
}
