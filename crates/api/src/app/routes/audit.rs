//! Read-only audit trail endpoints.

use std::sync::Arc;

use axum::{
    Router,
    extract::{
        Extension, Path, Query,
        rejection::{PathRejection, QueryRejection},
    },
    routing::get,
};

use warden_auth::{AuditRecord, AuthError, PermissionEvaluator};
use warden_core::{AuditId, Page};

use super::ApiResult;
use crate::app::dto::{ApiResponse, AuditQuery};
use crate::app::errors::invalid_field;
use crate::authz::{RouteGate, guarded};
use crate::app::services::AppServices;

pub fn router(evaluator: Arc<dyn PermissionEvaluator>) -> Router {
    let gate = || RouteGate::new("audit:read").with_evaluator(evaluator.clone());

    Router::new()
        .route("/", guarded(get(list_audit_logs), gate()))
        .route("/:id", guarded(get(get_audit_log), gate()))
}

/// GET /audit-logs
///
/// Newest first. Filters: `user_id`, `action`, `resource`, `from`, `to`.
pub async fn list_audit_logs(
    Extension(services): Extension<Arc<AppServices>>,
    query: Result<Query<AuditQuery>, QueryRejection>,
) -> ApiResult<ApiResponse<Page<AuditRecord>>> {
    let Query(query) = query?;
    let filter = query.filter().map_err(|e| AuthError::Validation(vec![e]))?;
    let page = services.audit_log.query(&filter, query.pagination()).await?;
    Ok(ApiResponse::ok("audit logs", page))
}

/// GET /audit-logs/:id
pub async fn get_audit_log(
    Extension(services): Extension<Arc<AppServices>>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<ApiResponse<AuditRecord>> {
    let Path(raw) = path?;
    let id: AuditId = raw.parse().map_err(|_| invalid_field("id", "must be a valid audit record id"))?;
    let record = services.audit_log.get(id).await?;
    Ok(ApiResponse::ok("audit log", record))
}
