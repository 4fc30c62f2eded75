use std::convert::Infallible;
use std::net::SocketAddr;

use axum::async_trait;
use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::{HeaderMap, request::Parts};

use warden_auth::Principal;
use warden_infra::RequestMeta;

/// Authenticated caller for a request.
///
/// Inserted by the bearer middleware; present on every protected route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext(pub Principal);

impl PrincipalContext {
    pub fn principal(&self) -> &Principal {
        &self.0
    }
}

/// Audit provenance of the current request: actor (when authenticated),
/// client address and user agent.
#[derive(Debug, Clone)]
pub struct RequestContext(pub RequestMeta);

#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());

        Ok(Self(RequestMeta {
            actor: parts.extensions.get::<PrincipalContext>().map(|ctx| ctx.0.id),
            path_id: None,
            ip_address: forwarded_for(&parts.headers).or(peer),
            user_agent: header_value(&parts.headers, axum::http::header::USER_AGENT.as_str()),
        }))
    }
}

/// First hop of `X-Forwarded-For`.
fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    header_value(headers, "x-forwarded-for")?
        .split(',')
        .next()
        .map(|hop| hop.trim().to_string())
        .filter(|hop| !hop.is_empty())
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
