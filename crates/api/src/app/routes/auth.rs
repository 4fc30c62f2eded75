//! Session endpoints: registration, login, token refresh and password flows.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, rejection::JsonRejection},
    http::StatusCode,
    routing::{get, post, put},
};

use warden_auth::{AuditAction, Registration, ResourceKind, TokenPair};
use warden_infra::audit::interceptor::nested_user_id;
use warden_infra::{AuditDescriptor, AuthSession, CurrentUser};

use super::ApiResult;
use crate::app::dto::{
    ApiResponse, ChangePasswordRequest, ForgotPasswordRequest, LoginRequest, RefreshRequest, ResetPasswordRequest,
};
use crate::app::services::AppServices;
use crate::context::{PrincipalContext, RequestContext};

const REGISTER: AuditDescriptor =
    AuditDescriptor::new(AuditAction::Create, ResourceKind::User).resource_id_from(nested_user_id);
const LOGIN: AuditDescriptor = AuditDescriptor::new(AuditAction::Login, ResourceKind::Auth).resource_id_from(nested_user_id);
const LOGOUT: AuditDescriptor = AuditDescriptor::new(AuditAction::Logout, ResourceKind::Auth).without_after();
const PASSWORD_CHANGE: AuditDescriptor = AuditDescriptor::new(AuditAction::PasswordChange, ResourceKind::User);
const PASSWORD_RESET: AuditDescriptor = AuditDescriptor::new(AuditAction::PasswordReset, ResourceKind::User);

const FORGOT_PASSWORD_MESSAGE: &str = "if an account with that email exists, a password reset link has been sent";

// ─────────────────────────────────────────────────────────────────────────────
// Routers
// ─────────────────────────────────────────────────────────────────────────────

/// Endpoints reachable without a bearer token.
pub fn public_router() -> Router {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password", post(reset_password))
}

/// Endpoints for any authenticated principal.
pub fn protected_router() -> Router {
    Router::new()
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
        .route("/auth/change-password", put(change_password))
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// POST /auth/register
pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    RequestContext(meta): RequestContext,
    payload: Result<Json<Registration>, JsonRejection>,
) -> ApiResult<(StatusCode, ApiResponse<AuthSession>)> {
    let Json(input) = payload?;
    let session = services
        .interceptor
        .intercept(&REGISTER, &meta, None, services.sessions.register(input))
        .await?;
    Ok((StatusCode::CREATED, ApiResponse::ok("registration successful", session)))
}

/// POST /auth/login
pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    RequestContext(meta): RequestContext,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<ApiResponse<AuthSession>> {
    let Json(body) = payload?;
    let session = services
        .interceptor
        .intercept(&LOGIN, &meta, None, services.sessions.login(&body.email, &body.password, &meta))
        .await?;
    Ok(ApiResponse::ok("login successful", session))
}

/// POST /auth/refresh
pub async fn refresh(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> ApiResult<ApiResponse<TokenPair>> {
    let Json(body) = payload?;
    let tokens = services.sessions.refresh(&body.refresh_token).await?;
    Ok(ApiResponse::ok("token refreshed", tokens))
}

/// POST /auth/forgot-password
///
/// The response is the same whether or not the account exists.
pub async fn forgot_password(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<ForgotPasswordRequest>, JsonRejection>,
) -> ApiResult<ApiResponse<()>> {
    let Json(body) = payload?;
    services.sessions.forgot_password(&body.email).await?;
    Ok(ApiResponse::message(FORGOT_PASSWORD_MESSAGE))
}

/// POST /auth/reset-password
pub async fn reset_password(
    Extension(services): Extension<Arc<AppServices>>,
    RequestContext(meta): RequestContext,
    payload: Result<Json<ResetPasswordRequest>, JsonRejection>,
) -> ApiResult<ApiResponse<()>> {
    let Json(body) = payload?;
    services
        .interceptor
        .intercept(
            &PASSWORD_RESET,
            &meta,
            None,
            services.sessions.reset_password(&body.token, body.password),
        )
        .await?;
    Ok(ApiResponse::message("password has been reset"))
}

/// POST /auth/logout
///
/// Tokens are stateless; this only records the event.
pub async fn logout(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    RequestContext(meta): RequestContext,
) -> ApiResult<ApiResponse<()>> {
    services
        .interceptor
        .intercept(&LOGOUT, &meta, None, services.sessions.logout(ctx.principal()))
        .await?;
    Ok(ApiResponse::message("logged out"))
}

/// GET /auth/me
pub async fn me(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
) -> ApiResult<ApiResponse<CurrentUser>> {
    let me = services.users.me(ctx.principal().id).await?;
    Ok(ApiResponse::ok("current user", me))
}

/// PUT /auth/change-password
pub async fn change_password(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    RequestContext(meta): RequestContext,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> ApiResult<ApiResponse<()>> {
    let Json(body) = payload?;
    services
        .interceptor
        .intercept(
            &PASSWORD_CHANGE,
            &meta,
            None,
            services
                .sessions
                .change_password(ctx.principal().id, body.current_password, body.new_password),
        )
        .await?;
    Ok(ApiResponse::message("password changed"))
}
