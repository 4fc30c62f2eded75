//! Role administration endpoints.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Extension, Path,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    routing::{delete, get, post, put},
};

use warden_auth::{AuditAction, PermissionEvaluator, ResourceKind, Role, RoleDraft, RoleUpdate};
use warden_core::RoleId;
use warden_infra::AuditDescriptor;

use super::ApiResult;
use crate::app::dto::ApiResponse;
use crate::app::errors::{ApiError, invalid_field};
use crate::app::services::AppServices;
use crate::authz::{RouteGate, guarded};
use crate::context::RequestContext;

const CREATE: AuditDescriptor = AuditDescriptor::new(AuditAction::Create, ResourceKind::Role);
const UPDATE: AuditDescriptor = AuditDescriptor::new(AuditAction::Update, ResourceKind::Role).with_before();
const DELETE: AuditDescriptor = AuditDescriptor::new(AuditAction::Delete, ResourceKind::Role)
    .with_before()
    .without_after()
    .resource_id_from_path();

pub fn router(evaluator: Arc<dyn PermissionEvaluator>) -> Router {
    let gate = |permission: &'static str| RouteGate::new(permission).with_evaluator(evaluator.clone());

    Router::new()
        .route("/", guarded(get(list_roles), gate("roles:read")))
        .route("/", guarded(post(create_role), gate("roles:create")))
        .route("/:id", guarded(get(get_role), gate("roles:read")))
        .route("/:id", guarded(put(update_role), gate("roles:update")))
        .route("/:id", guarded(delete(delete_role), gate("roles:delete")))
}

fn parse_role_id(raw: &str) -> Result<RoleId, ApiError> {
    raw.parse().map_err(|_| invalid_field("id", "must be a valid role id"))
}

/// GET /roles
pub async fn list_roles(Extension(services): Extension<Arc<AppServices>>) -> ApiResult<ApiResponse<Vec<Role>>> {
    let roles = services.roles.list().await?;
    Ok(ApiResponse::ok("roles", roles))
}

/// GET /roles/:id
pub async fn get_role(
    Extension(services): Extension<Arc<AppServices>>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<ApiResponse<Role>> {
    let Path(raw) = path?;
    let role = services.roles.get(parse_role_id(&raw)?).await?;
    Ok(ApiResponse::ok("role", role))
}

/// POST /roles
pub async fn create_role(
    Extension(services): Extension<Arc<AppServices>>,
    RequestContext(meta): RequestContext,
    payload: Result<Json<RoleDraft>, JsonRejection>,
) -> ApiResult<(StatusCode, ApiResponse<Role>)> {
    let Json(draft) = payload?;
    let role = services
        .interceptor
        .intercept(&CREATE, &meta, None, services.roles.create(draft))
        .await?;
    Ok((StatusCode::CREATED, ApiResponse::ok("role created", role)))
}

/// PUT /roles/:id
pub async fn update_role(
    Extension(services): Extension<Arc<AppServices>>,
    RequestContext(meta): RequestContext,
    path: Result<Path<String>, PathRejection>,
    payload: Result<Json<RoleUpdate>, JsonRejection>,
) -> ApiResult<ApiResponse<Role>> {
    let Path(raw) = path?;
    let Json(update) = payload?;
    let id = parse_role_id(&raw)?;

    let before = services.interceptor.snapshot_before(&UPDATE, || services.roles.find(id)).await;
    let role = services
        .interceptor
        .intercept(&UPDATE, &meta.with_path_id(raw), before, services.roles.update(id, update))
        .await?;
    Ok(ApiResponse::ok("role updated", role))
}

/// DELETE /roles/:id
pub async fn delete_role(
    Extension(services): Extension<Arc<AppServices>>,
    RequestContext(meta): RequestContext,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<ApiResponse<()>> {
    let Path(raw) = path?;
    let id = parse_role_id(&raw)?;

    let before = services.interceptor.snapshot_before(&DELETE, || services.roles.find(id)).await;
    services
        .interceptor
        .intercept(&DELETE, &meta.with_path_id(raw), before, services.roles.delete(id))
        .await?;
    Ok(ApiResponse::message("role deleted"))
}
