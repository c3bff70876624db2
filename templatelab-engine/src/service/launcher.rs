//! Execution launcher
//!
//! Public entry point for executions: persists a running execution, seeds
//! its progress and hands it to a detached runner task. Also serves status
//! reads and cancellation.

use std::sync::Arc;

use templatelab_core::domain::execution::{Execution, ExecutionStatus, InputData};
use templatelab_core::domain::progress::ProgressEntry;
use templatelab_core::dto::execution::ExecutionView;
use tracing::{info, warn};
use uuid::Uuid;

use crate::service::error::ExecutionError;
use crate::service::runner::PipelineRunner;
use crate::store::{ExecutionStore, ProgressCache};

pub struct ExecutionLauncher {
    executions: Arc<dyn ExecutionStore>,
    progress: Arc<dyn ProgressCache>,
    runner: Arc<PipelineRunner>,
}

impl ExecutionLauncher {
    pub fn new(
        executions: Arc<dyn ExecutionStore>,
        progress: Arc<dyn ProgressCache>,
        runner: Arc<PipelineRunner>,
    ) -> Self {
        Self {
            executions,
            progress,
            runner,
        }
    }

    /// Starts an execution and returns its initial snapshot immediately
    ///
    /// The pipeline is not checked here; a missing pipeline fails the
    /// execution in the background.
    pub async fn launch(
        &self,
        template_id: Uuid,
        user_id: Uuid,
        input_data: InputData,
    ) -> Result<Execution, ExecutionError> {
        let execution = Execution::start(template_id, user_id, input_data);
        self.executions.create(&execution).await?;

        let seed = ProgressEntry {
            status: ExecutionStatus::Running,
            progress: 0,
        };
        if let Err(e) = self
            .progress
            .set(execution.id, seed, self.runner.settings().progress_ttl)
            .await
        {
            warn!("Failed to seed progress of execution {}: {}", execution.id, e);
        }

        let runner = Arc::clone(&self.runner);
        let (execution_id, input_data) = (execution.id, execution.input_data.clone());
        tokio::spawn(async move {
            runner.run(execution_id, template_id, input_data).await;
        });

        info!(
            "Execution launched: {} for template {} by user {}",
            execution.id, template_id, user_id
        );

        Ok(execution)
    }

    /// Durable record merged with live progress
    ///
    /// A cache failure is treated as a miss.
    pub async fn status(&self, execution_id: Uuid) -> Result<ExecutionView, ExecutionError> {
        let execution = self.executions.get(execution_id).await?;

        let live = self.progress.get(execution_id).await.unwrap_or_else(|e| {
            warn!("Failed to read progress of execution {}: {}", execution_id, e);
            None
        });

        Ok(ExecutionView::merge(execution, live))
    }

    /// Cancels a pending or running execution
    ///
    /// The runner notices at its next heartbeat and stops before the next
    /// step.
    pub async fn cancel(&self, execution_id: Uuid) -> Result<Execution, ExecutionError> {
        let execution = self
            .executions
            .update(execution_id, ExecutionStatus::Cancelled, None, None)
            .await?;

        let entry = ProgressEntry::finished(ExecutionStatus::Cancelled);
        if let Err(e) = self
            .progress
            .set(execution_id, entry, self.runner.settings().progress_ttl)
            .await
        {
            warn!("Failed to cache cancellation of execution {}: {}", execution_id, e);
        }

        info!("Execution cancelled: {}", execution_id);

        Ok(execution)
    }
}
