//! Service error type

use templatelab_core::domain::pipeline::PipelineError;
use thiserror::Error;
use uuid::Uuid;

use crate::provider::ProviderError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("No pipeline found for template {0}")]
    PipelineNotFound(Uuid),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Failed to encode step output: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The execution was cancelled or reconciled while the runner held it
    #[error("Execution {0} is no longer running")]
    Interrupted(Uuid),
}
