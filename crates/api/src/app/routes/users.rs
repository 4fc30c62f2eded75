//! Principal administration endpoints.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Extension, Path, Query,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    routing::{delete, get, put},
};

use warden_auth::{AuditAction, PermissionEvaluator, ProfileUpdate, ResourceKind, UserProfile};
use warden_core::{Page, UserId};
use warden_infra::AuditDescriptor;

use super::ApiResult;
use crate::app::dto::{ApiResponse, AssignRoleRequest, PageQuery, SetStatusRequest};
use crate::app::errors::{ApiError, invalid_field};
use crate::app::services::AppServices;
use crate::authz::{RouteGate, guarded};
use crate::context::{PrincipalContext, RequestContext};

const UPDATE: AuditDescriptor = AuditDescriptor::new(AuditAction::Update, ResourceKind::User).with_before();
const DELETE: AuditDescriptor = AuditDescriptor::new(AuditAction::Delete, ResourceKind::User)
    .with_before()
    .without_after()
    .resource_id_from_path();

pub fn router(evaluator: Arc<dyn PermissionEvaluator>) -> Router {
    let gate = |permission: &'static str| RouteGate::new(permission).with_evaluator(evaluator.clone());

    Router::new()
        .route("/", guarded(get(list_users), gate("users:read")))
        .route("/:id", guarded(get(get_user), gate("users:read").owned()))
        .route("/:id", guarded(put(update_user), gate("users:update").owned()))
        .route("/:id", guarded(delete(delete_user), gate("users:delete")))
        .route("/:id/role", guarded(put(assign_role), gate("users:update")))
        .route("/:id/status", guarded(put(set_status), gate("users:update")))
}

pub(crate) fn parse_user_id(raw: &str) -> Result<UserId, ApiError> {
    raw.parse().map_err(|_| invalid_field("id", "must be a valid user id"))
}

/// GET /users
pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> ApiResult<ApiResponse<Page<UserProfile>>> {
    let Query(query) = query?;
    let page = services.users.list(query.pagination()).await?;
    Ok(ApiResponse::ok("users", page))
}

/// GET /users/:id
pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<ApiResponse<UserProfile>> {
    let Path(raw) = path?;
    let user = services.users.get(parse_user_id(&raw)?).await?;
    Ok(ApiResponse::ok("user", user))
}

/// PUT /users/:id
pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    RequestContext(meta): RequestContext,
    path: Result<Path<String>, PathRejection>,
    payload: Result<Json<ProfileUpdate>, JsonRejection>,
) -> ApiResult<ApiResponse<UserProfile>> {
    let Path(raw) = path?;
    let Json(update) = payload?;
    let id = parse_user_id(&raw)?;

    let before = services.interceptor.snapshot_before(&UPDATE, || services.users.find(id)).await;
    let user = services
        .interceptor
        .intercept(&UPDATE, &meta.with_path_id(raw), before, services.users.update_profile(id, update))
        .await?;
    Ok(ApiResponse::ok("user updated", user))
}

/// PUT /users/:id/role
pub async fn assign_role(
    Extension(services): Extension<Arc<AppServices>>,
    RequestContext(meta): RequestContext,
    path: Result<Path<String>, PathRejection>,
    payload: Result<Json<AssignRoleRequest>, JsonRejection>,
) -> ApiResult<ApiResponse<UserProfile>> {
    let Path(raw) = path?;
    let Json(body) = payload?;
    let id = parse_user_id(&raw)?;

    let before = services.interceptor.snapshot_before(&UPDATE, || services.users.find(id)).await;
    let user = services
        .interceptor
        .intercept(&UPDATE, &meta.with_path_id(raw), before, services.users.assign_role(id, body.role_id))
        .await?;
    Ok(ApiResponse::ok("role assigned", user))
}

/// PUT /users/:id/status
pub async fn set_status(
    Extension(services): Extension<Arc<AppServices>>,
    RequestContext(meta): RequestContext,
    path: Result<Path<String>, PathRejection>,
    payload: Result<Json<SetStatusRequest>, JsonRejection>,
) -> ApiResult<ApiResponse<UserProfile>> {
    let Path(raw) = path?;
    let Json(body) = payload?;
    let id = parse_user_id(&raw)?;

    let before = services.interceptor.snapshot_before(&UPDATE, || services.users.find(id)).await;
    let user = services
        .interceptor
        .intercept(&UPDATE, &meta.with_path_id(raw), before, services.users.set_active(id, body.is_active))
        .await?;
    let message = if user.is_active { "user activated" } else { "user deactivated" };
    Ok(ApiResponse::ok(message, user))
}

/// DELETE /users/:id
pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    RequestContext(meta): RequestContext,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<ApiResponse<()>> {
    let Path(raw) = path?;
    let id = parse_user_id(&raw)?;

    let before = services.interceptor.snapshot_before(&DELETE, || services.users.find(id)).await;
    services
        .interceptor
        .intercept(&DELETE, &meta.with_path_id(raw), before, services.users.delete(ctx.principal().id, id))
        .await?;
    Ok(ApiResponse::message("user deleted"))
}
