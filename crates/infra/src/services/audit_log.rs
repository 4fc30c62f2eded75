//! Read side of the audit trail.

use std::sync::Arc;

use warden_auth::{AuditFilter, AuditRecord, AuthError, AuthResult};
use warden_core::{AuditId, Page, Pagination};

use crate::store::AuditStore;

pub struct AuditLogService {
    store: Arc<dyn AuditStore>,
}

impl AuditLogService {
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        Self { store }
    }

    /// Newest first.
    pub async fn query(&self, filter: &AuditFilter, pagination: Pagination) -> AuthResult<Page<AuditRecord>> {
        Ok(self.store.query(filter, pagination).await?)
    }

    pub async fn get(&self, id: AuditId) -> AuthResult<AuditRecord> {
        self.store.get(id).await?.ok_or(AuthError::NotFound("audit record"))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use serde_json::Value;

    use warden_auth::{AuditAction, ResourceKind};

    use super::*;
    use crate::audit::{AuditDescriptor, RequestMeta};
    use crate::audit::interceptor::nested_user_id;
    use crate::testkit::{Harness, registration};

    #[tokio::test]
    async fn intercepted_registration_is_queryable_by_actor() {
        let h = Harness::new().await;
        let descriptor = AuditDescriptor::new(AuditAction::Create, ResourceKind::User).resource_id_from(nested_user_id);

        let session = h
            .interceptor
            .intercept(
                &descriptor,
                &RequestMeta::default(),
                None,
                h.sessions.register(registration("ada@example.com")),
            )
            .await
            .unwrap();
        let id = session.user.id;

        let filter = AuditFilter {
            user_id: Some(id),
            action: Some(AuditAction::Create),
            ..Default::default()
        };
        let page = h.audit_log.query(&filter, Pagination::default()).await.unwrap();
        assert_eq!(page.total, 1);

        let record = h.audit_log.get(page.items[0].id).await.unwrap();
        assert_eq!(record.resource_id, Some(id.to_string()));
        let after = record.after.unwrap();
        assert!(after.get("tokens").is_none());
        assert_eq!(after["user"]["email"], Value::from("ada@example.com"));
    }

    #[tokio::test]
    async fn time_range_filter_and_missing_record() {
        let h = Harness::new().await;
        h.interceptor
            .intercept(
                &AuditDescriptor::new(AuditAction::Logout, ResourceKind::Auth),
                &RequestMeta::default(),
                None,
                async { Ok(()) },
            )
            .await
            .unwrap();

        let future = AuditFilter {
            from: Some(Utc::now() + Duration::minutes(1)),
            ..Default::default()
        };
        assert_eq!(h.audit_log.query(&future, Pagination::default()).await.unwrap().total, 0);
        assert_eq!(
            h.audit_log.get(AuditId::new()).await.unwrap_err(),
            AuthError::NotFound("audit record")
        );
    }
}
