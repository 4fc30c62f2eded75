//! Per-route authorization gate.
//!
//! Each protected route declares one required permission string. Ownership
//! aware routes also pass the `:id` path parameter as the resource owner, so a
//! `:self` grant admits the caller acting on their own record. The gate runs
//! after the bearer middleware and before the handler.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Request, State},
    middleware::{Next, from_fn_with_state},
    response::Response,
    routing::MethodRouter,
};
use tracing::{debug, warn};

use warden_auth::{AuthError, Permission, PermissionEvaluator, RbacEvaluator, authorize};
use warden_core::UserId;

use crate::app::errors::ApiError;
use crate::context::PrincipalContext;

/// Declared requirement of one route.
#[derive(Clone)]
pub struct RouteGate {
    required: &'static str,
    ownership: bool,
    evaluator: Arc<dyn PermissionEvaluator>,
}

impl RouteGate {
    pub fn new(required: &'static str) -> Self {
        Self {
            required,
            ownership: false,
            evaluator: Arc::new(RbacEvaluator),
        }
    }

    /// Treat the `:id` path parameter as the owner of the resource.
    pub fn owned(mut self) -> Self {
        self.ownership = true;
        self
    }

    pub fn with_evaluator(mut self, evaluator: Arc<dyn PermissionEvaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    /// Decide for `principal`; `path_id` is the raw `:id` segment, if any.
    pub fn check(&self, principal: &PrincipalContext, path_id: Option<&str>) -> Result<(), AuthError> {
        let required = Permission::parse(self.required).map_err(|err| {
            warn!(permission = self.required, error = %err, "route declares a malformed permission");
            AuthError::InsufficientPermission(self.required.to_string())
        })?;

        let owner = if self.ownership {
            path_id.and_then(|raw| raw.parse::<UserId>().ok())
        } else {
            None
        };

        authorize(self.evaluator.as_ref(), principal.principal(), &required, owner).inspect_err(|_| {
            debug!(user_id = %principal.principal().id, permission = self.required, "authorization denied");
        })
    }
}

pub async fn gate_middleware(
    State(gate): State<RouteGate>,
    path: Option<Path<HashMap<String, String>>>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let principal = req
        .extensions()
        .get::<PrincipalContext>()
        .ok_or(AuthError::InvalidToken)?;

    let path_id = path.as_ref().and_then(|Path(params)| params.get("id")).map(String::as_str);
    gate.check(principal, path_id)?;

    Ok(next.run(req).await)
}

/// Put `route` behind `gate`: `guarded(get(list_users), RouteGate::new("users:read"))`.
pub fn guarded(route: MethodRouter, gate: RouteGate) -> MethodRouter {
    route.route_layer(from_fn_with_state(gate, gate_middleware))
}
