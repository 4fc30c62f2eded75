//! Success-gated audit decorator.
//!
//! [`AuditInterceptor::intercept`] awaits the wrapped operation first and
//! writes a record only when it returned `Ok`. The structured result is
//! serialized once and used for the `after` snapshot, the resource id and the
//! actor fallback. The operation's result is returned unchanged whether or not
//! the audit write succeeds.

use std::future::Future;

use serde::Serialize;
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use warden_auth::{AuditAction, AuditRecord, AuthResult, ResourceKind};
use warden_core::UserId;

use super::AuditWriter;

/// Pulls a resource id out of the serialized result.
pub type ResourceIdExtractor = fn(&Value) -> Option<String>;

/// Provenance of the call being audited.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMeta {
    /// Authenticated caller, if any.
    pub actor: Option<UserId>,
    /// Id taken from the route path (`/users/:id`).
    pub path_id: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestMeta {
    pub fn with_actor(mut self, actor: UserId) -> Self {
        self.actor = Some(actor);
        self
    }

    pub fn with_path_id(mut self, id: impl Into<String>) -> Self {
        self.path_id = Some(id.into());
        self
    }
}

/// What to record for one kind of operation.
#[derive(Debug, Clone, Copy)]
pub struct AuditDescriptor {
    pub action: AuditAction,
    pub resource: ResourceKind,
    pub capture_before: bool,
    pub capture_after: bool,
    pub resource_id: Option<ResourceIdExtractor>,
}

impl AuditDescriptor {
    /// Defaults: no before snapshot, after snapshot on, resource id from `id`.
    pub const fn new(action: AuditAction, resource: ResourceKind) -> Self {
        Self {
            action,
            resource,
            capture_before: false,
            capture_after: true,
            resource_id: Some(top_level_id),
        }
    }

    pub const fn with_before(mut self) -> Self {
        self.capture_before = true;
        self
    }

    pub const fn without_after(mut self) -> Self {
        self.capture_after = false;
        self
    }

    pub const fn resource_id_from(mut self, extractor: ResourceIdExtractor) -> Self {
        self.resource_id = Some(extractor);
        self
    }

    /// Resource id comes only from the route path.
    pub const fn resource_id_from_path(mut self) -> Self {
        self.resource_id = None;
        self
    }
}

/// `id` at the top level of the result.
pub fn top_level_id(value: &Value) -> Option<String> {
    value_as_id(value.get("id")?)
}

/// `user.id` inside the result.
pub fn nested_user_id(value: &Value) -> Option<String> {
    value_as_id(value.get("user")?.get("id")?)
}

fn value_as_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Actor fallback from the result payload: `id`, then `user.id`.
fn actor_from_result(value: &Value) -> Option<UserId> {
    top_level_id(value)
        .or_else(|| nested_user_id(value))
        .and_then(|id| Uuid::parse_str(&id).ok())
        .map(UserId::from_uuid)
}

#[derive(Clone)]
pub struct AuditInterceptor {
    writer: AuditWriter,
}

impl AuditInterceptor {
    pub fn new(writer: AuditWriter) -> Self {
        Self { writer }
    }

    pub fn writer(&self) -> &AuditWriter {
        &self.writer
    }

    /// Load the before snapshot, but only if the descriptor wants one.
    ///
    /// A failed or empty load yields `None`; it never blocks the operation.
    pub async fn snapshot_before<S, F, Fut>(&self, descriptor: &AuditDescriptor, load: F) -> Option<Value>
    where
        S: Serialize,
        F: FnOnce() -> Fut,
        Fut: Future<Output = AuthResult<Option<S>>>,
    {
        if !descriptor.capture_before {
            return None;
        }
        match load().await {
            Ok(Some(state)) => serde_json::to_value(state).ok(),
            Ok(None) => None,
            Err(err) => {
                warn!(action = %descriptor.action, error = %err, "could not load audit before-snapshot");
                None
            }
        }
    }

    /// Run `operation`; on `Ok`, append an audit record describing it.
    pub async fn intercept<T, Fut>(
        &self,
        descriptor: &AuditDescriptor,
        meta: &RequestMeta,
        before: Option<Value>,
        operation: Fut,
    ) -> AuthResult<T>
    where
        T: Serialize,
        Fut: Future<Output = AuthResult<T>>,
    {
        let result = operation.await;
        if let Ok(output) = &result {
            let record = build_record(descriptor, meta, before, output);
            self.writer.record(record).await;
        }
        result
    }
}

fn build_record<T: Serialize>(
    descriptor: &AuditDescriptor,
    meta: &RequestMeta,
    before: Option<Value>,
    output: &T,
) -> AuditRecord {
    let after = match serde_json::to_value(output) {
        Ok(value) => value,
        Err(err) => {
            warn!(action = %descriptor.action, error = %err, "could not serialize audited result");
            Value::Null
        }
    };

    let resource_id = descriptor
        .resource_id
        .and_then(|extract| extract(&after))
        .or_else(|| meta.path_id.clone());
    let actor = meta.actor.or_else(|| actor_from_result(&after));

    let mut record = AuditRecord::new(descriptor.action, descriptor.resource)
        .actor(actor)
        .resource_id(resource_id)
        .origin(meta.ip_address.clone(), meta.user_agent.clone());

    if descriptor.capture_before {
        if let Some(before) = before {
            record = record.before(before);
        }
    }
    if descriptor.capture_after && !after.is_null() {
        record = record.after(after);
    }
    record
}
