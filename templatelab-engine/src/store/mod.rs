//! Execution state storage
//!
//! Trait seams for the durable execution record, the pipeline definitions and
//! the ephemeral progress cache. Implementations are constructed once in
//! `main` and shared as `Arc<dyn …>`.

mod postgres;
mod progress;

pub use postgres::{PgExecutionStore, PgPipelineStore};
pub use progress::{InMemoryProgressCache, RedisProgressCache};

use std::time::Duration;

use async_trait::async_trait;
use templatelab_core::domain::execution::{
    Execution, ExecutionStatus, StepResults, TransitionError,
};
use templatelab_core::domain::pipeline::Pipeline;
use templatelab_core::domain::progress::ProgressEntry;
use templatelab_core::domain::usage::UsageRecord;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Execution not found: {0}")]
    NotFound(Uuid),

    #[error("Execution already exists: {0}")]
    Conflict(Uuid),

    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Durable record of executions and their usage
#[async_trait]
pub trait ExecutionStore: Send + Sync {
    /// Persists a new execution; `Conflict` if the ID is taken
    async fn create(&self, execution: &Execution) -> Result<(), StoreError>;

    async fn get(&self, id: Uuid) -> Result<Execution, StoreError>;

    /// Moves an execution to `status`, returning the updated record
    ///
    /// `completed_at` is set when `status` is terminal. Transitions out of a
    /// terminal state fail with `InvalidTransition` and leave the record
    /// untouched.
    async fn update(
        &self,
        id: Uuid,
        status: ExecutionStatus,
        results: Option<StepResults>,
        error_message: Option<String>,
    ) -> Result<Execution, StoreError>;

    /// Renews the lease; `false` when the execution is no longer running
    async fn heartbeat(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Fails running executions whose lease is older than `lease_timeout`
    async fn fail_orphaned(&self, lease_timeout: Duration) -> Result<Vec<Uuid>, StoreError>;

    async fn record_usage(&self, usage: &UsageRecord) -> Result<(), StoreError>;
}

/// Pipeline definitions, one per template
#[async_trait]
pub trait PipelineStore: Send + Sync {
    async fn find_by_template(&self, template_id: Uuid) -> Result<Option<Pipeline>, StoreError>;

    /// Inserts or replaces the template's pipeline
    async fn save(&self, pipeline: &Pipeline) -> Result<Pipeline, StoreError>;
}

/// Best-effort, TTL-bounded live progress
#[async_trait]
pub trait ProgressCache: Send + Sync {
    async fn set(&self, id: Uuid, entry: ProgressEntry, ttl: Duration) -> Result<(), CacheError>;

    async fn get(&self, id: Uuid) -> Result<Option<ProgressEntry>, CacheError>;
}

/// Key under which an execution's progress is cached
pub fn progress_key(id: Uuid) -> String {
    format!("execution:{id}")
}
