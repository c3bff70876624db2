//! Orphan reconciler
//!
//! Periodically fails running executions whose runner stopped renewing the
//! lease, e.g. after a crash.

use std::sync::Arc;
use std::time::Duration;

use templatelab_core::domain::execution::ExecutionStatus;
use templatelab_core::domain::progress::ProgressEntry;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::service::error::ExecutionError;
use crate::store::{ExecutionStore, ProgressCache};

pub struct OrphanReconciler {
    executions: Arc<dyn ExecutionStore>,
    progress: Arc<dyn ProgressCache>,
    lease_timeout: Duration,
    progress_ttl: Duration,
}

impl OrphanReconciler {
    pub fn new(
        executions: Arc<dyn ExecutionStore>,
        progress: Arc<dyn ProgressCache>,
        lease_timeout: Duration,
        progress_ttl: Duration,
    ) -> Self {
        Self {
            executions,
            progress,
            lease_timeout,
            progress_ttl,
        }
    }

    /// Fails every orphaned execution once, returning their IDs
    pub async fn sweep_once(&self) -> Result<Vec<Uuid>, ExecutionError> {
        let orphaned = self.executions.fail_orphaned(self.lease_timeout).await?;

        for id in &orphaned {
            warn!("Execution {} orphaned: lease expired, marked failed", id);

            let entry = ProgressEntry::finished(ExecutionStatus::Failed);
            if let Err(e) = self.progress.set(*id, entry, self.progress_ttl).await {
                warn!("Failed to cache failure of execution {}: {}", id, e);
            }
        }

        Ok(orphaned)
    }

    /// Sweeps every `interval` for the lifetime of the process
    pub fn spawn(self, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = time::interval(interval);

            loop {
                ticker.tick().await;

                match self.sweep_once().await {
                    Ok(orphaned) if orphaned.is_empty() => debug!("No orphaned executions"),
                    Ok(orphaned) => warn!("Reconciled {} orphaned execution(s)", orphaned.len()),
                    Err(e) => error!("Orphan sweep failed: {}", e),
                }
            }
        })
    }
}
