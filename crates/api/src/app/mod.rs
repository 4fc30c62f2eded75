//! Router assembly.

use std::sync::Arc;

use axum::{Extension, Router, middleware::from_fn_with_state, routing::get};
use tower::ServiceBuilder;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

use crate::middleware::{self, AuthState};

/// Build the full HTTP application.
///
/// Public routes: `/health` and the credential-less `/auth/*` endpoints.
/// Everything else sits behind the bearer middleware, and per-route gates
/// enforce permissions.
pub fn build_app(services: Arc<AppServices>) -> Router {
    let auth_state = AuthState {
        issuer: services.issuer.clone(),
    };

    let protected = routes::router(services.evaluator.clone())
        .layer(from_fn_with_state(auth_state, middleware::auth_middleware));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::auth::public_router())
        .merge(protected)
        .layer(ServiceBuilder::new().layer(Extension(services)))
}
