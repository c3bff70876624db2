//! PostgreSQL-backed stores

use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use templatelab_core::domain::execution::{
    Execution, ExecutionStatus, ORPHANED_MESSAGE, StepResults,
};
use templatelab_core::domain::pipeline::Pipeline;
use templatelab_core::domain::usage::UsageRecord;
use uuid::Uuid;

use super::{ExecutionStore, PipelineStore, StoreError};
use crate::repository::{execution_repository, pipeline_repository, usage_repository};

pub struct PgExecutionStore {
    pool: PgPool,
}

impl PgExecutionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ExecutionStore for PgExecutionStore {
    async fn create(&self, execution: &Execution) -> Result<(), StoreError> {
        execution_repository::create(&self.pool, execution)
            .await
            .map_err(|e| match e.as_database_error() {
                Some(db) if db.is_unique_violation() => StoreError::Conflict(execution.id),
                _ => StoreError::Database(e),
            })
    }

    async fn get(&self, id: Uuid) -> Result<Execution, StoreError> {
        execution_repository::find_by_id(&self.pool, id)
            .await?
            .ok_or(StoreError::NotFound(id))
    }

    async fn update(
        &self,
        id: Uuid,
        status: ExecutionStatus,
        results: Option<StepResults>,
        error_message: Option<String>,
    ) -> Result<Execution, StoreError> {
        // The conditional UPDATE only applies if nobody moved the execution
        // since we read it; otherwise re-read and re-check the transition.
        loop {
            let current = self.get(id).await?;
            current.status.transition_to(status)?;

            let applied = execution_repository::transition(
                &self.pool,
                id,
                current.status,
                status,
                results.as_ref(),
                error_message.as_deref(),
            )
            .await?;

            if applied {
                return self.get(id).await;
            }

            tracing::debug!("Execution {} changed concurrently, retrying update", id);
        }
    }

    async fn heartbeat(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(execution_repository::touch_heartbeat(&self.pool, id).await?)
    }

    async fn fail_orphaned(&self, lease_timeout: Duration) -> Result<Vec<Uuid>, StoreError> {
        let Some(cutoff) = chrono::Duration::from_std(lease_timeout)
            .ok()
            .and_then(|lease| chrono::Utc::now().checked_sub_signed(lease))
        else {
            return Ok(Vec::new());
        };

        Ok(execution_repository::fail_stale(&self.pool, cutoff, ORPHANED_MESSAGE).await?)
    }

    async fn record_usage(&self, usage: &UsageRecord) -> Result<(), StoreError> {
        Ok(usage_repository::create(&self.pool, usage).await?)
    }
}

pub struct PgPipelineStore {
    pool: PgPool,
}

impl PgPipelineStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PipelineStore for PgPipelineStore {
    async fn find_by_template(&self, template_id: Uuid) -> Result<Option<Pipeline>, StoreError> {
        Ok(pipeline_repository::find_by_template(&self.pool, template_id).await?)
    }

    async fn save(&self, pipeline: &Pipeline) -> Result<Pipeline, StoreError> {
        Ok(pipeline_repository::upsert(&self.pool, pipeline).await?)
    }
}
