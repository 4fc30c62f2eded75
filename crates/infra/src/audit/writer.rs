use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info};

use warden_auth::AuditRecord;

use crate::store::{AuditStore, StoreResult};

/// Best-effort audit sink.
///
/// A failed append is logged and dropped; it never reaches the caller.
#[derive(Clone)]
pub struct AuditWriter {
    store: Arc<dyn AuditStore>,
}

impl AuditWriter {
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn AuditStore> {
        &self.store
    }

    pub async fn record(&self, record: AuditRecord) {
        let (action, resource, audit_id) = (record.action, record.resource, record.id);
        if let Err(err) = self.store.append(record).await {
            error!(
                %audit_id,
                action = %action,
                resource = %resource,
                error = %err,
                "failed to write audit record"
            );
        }
    }

    /// Retention: drop records created before `cutoff`.
    pub async fn purge_before(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        let purged = self.store.purge_before(cutoff).await?;
        if purged > 0 {
            info!(purged, %cutoff, "purged expired audit records");
        }
        Ok(purged)
    }
}
