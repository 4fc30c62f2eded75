use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::audit::AuditWriter;

#[derive(Debug, Clone, Copy)]
pub struct RetentionConfig {
    /// Records older than this many days are deleted.
    pub retention_days: u32,
    /// How often the sweep runs.
    pub interval: Duration,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            retention_days: 90,
            interval: Duration::from_secs(60 * 60),
        }
    }
}

/// Handle to stop a running retention worker.
#[derive(Debug)]
pub struct RetentionHandle {
    shutdown: Arc<Notify>,
    join: JoinHandle<()>,
}

impl RetentionHandle {
    /// Request shutdown and wait for the task to finish.
    pub async fn shutdown(self) {
        self.shutdown.notify_one();
        let _ = self.join.await;
    }
}

/// Periodically deletes audit records past the retention window.
#[derive(Debug)]
pub struct RetentionWorker;

impl RetentionWorker {
    /// One sweep. Returns the number of records deleted.
    pub async fn sweep(writer: &AuditWriter, retention_days: u32) -> u64 {
        let cutoff = Utc::now() - chrono::Duration::days(i64::from(retention_days));
        match writer.purge_before(cutoff).await {
            Ok(purged) => purged,
            Err(err) => {
                error!(error = %err, "audit retention sweep failed");
                0
            }
        }
    }

    /// Spawn the sweep loop on the current runtime. The first sweep runs immediately.
    pub fn spawn(writer: AuditWriter, config: RetentionConfig) -> RetentionHandle {
        let shutdown = Arc::new(Notify::new());
        let signal = shutdown.clone();

        let join = tokio::spawn(async move {
            info!(retention_days = config.retention_days, "audit retention worker started");
            let mut ticker = tokio::time::interval(config.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = signal.notified() => {
                        info!("audit retention worker stopping");
                        break;
                    }
                    _ = ticker.tick() => {
                        Self::sweep(&writer, config.retention_days).await;
                    }
                }
            }
        });

        RetentionHandle { shutdown, join }
    }
}
