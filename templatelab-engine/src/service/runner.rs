//! Pipeline runner
//!
//! Runs every step of one execution in plan order, publishing progress
//! before each step and renewing the execution's lease while it works.
//! Outcomes are only visible through the stores: the runner persists
//! `completed` (plus a usage record) or `failed`, and returns nothing.

use std::sync::Arc;
use std::time::Duration;

use templatelab_core::domain::execution::{ExecutionStatus, InputData, StepResults};
use templatelab_core::domain::plan::ExecutionPlan;
use templatelab_core::domain::progress::ProgressEntry;
use templatelab_core::domain::usage::UsageRecord;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::service::error::ExecutionError;
use crate::service::step_executor::StepExecutor;
use crate::store::{ExecutionStore, PipelineStore, ProgressCache, StoreError};

/// Timing knobs of the runner
#[derive(Debug, Clone, Copy)]
pub struct RunnerSettings {
    /// Lifetime of each progress cache entry
    pub progress_ttl: Duration,

    /// How often the lease is renewed while a step is in flight
    pub heartbeat_interval: Duration,
}

pub struct PipelineRunner {
    executions: Arc<dyn ExecutionStore>,
    pipelines: Arc<dyn PipelineStore>,
    progress: Arc<dyn ProgressCache>,
    executor: StepExecutor,
    settings: RunnerSettings,
}

impl PipelineRunner {
    pub fn new(
        executions: Arc<dyn ExecutionStore>,
        pipelines: Arc<dyn PipelineStore>,
        progress: Arc<dyn ProgressCache>,
        executor: StepExecutor,
        settings: RunnerSettings,
    ) -> Self {
        Self {
            executions,
            pipelines,
            progress,
            executor,
            settings,
        }
    }

    pub fn settings(&self) -> RunnerSettings {
        self.settings
    }

    /// Runs the template's pipeline for an already persisted execution
    pub async fn run(&self, execution_id: Uuid, template_id: Uuid, input_data: InputData) {
        let started = Instant::now();
        info!("Running execution {} (template {})", execution_id, template_id);

        match self.run_steps(execution_id, template_id, &input_data).await {
            Ok(results) => self.complete(execution_id, results, started.elapsed()).await,
            Err(ExecutionError::Interrupted(_)) => {
                info!(
                    "Execution {} is no longer running, stopping before the next step",
                    execution_id
                );
            }
            Err(e) => self.fail(execution_id, e).await,
        }
    }

    async fn run_steps(
        &self,
        execution_id: Uuid,
        template_id: Uuid,
        input_data: &InputData,
    ) -> Result<StepResults, ExecutionError> {
        let pipeline = self
            .pipelines
            .find_by_template(template_id)
            .await?
            .filter(|p| !p.steps.is_empty())
            .ok_or(ExecutionError::PipelineNotFound(template_id))?;

        let plan = ExecutionPlan::build(&pipeline.steps)?;
        let total = plan.len();
        let mut results = StepResults::with_capacity(total);

        for (index, step) in plan.steps(&pipeline.steps).enumerate() {
            self.publish(execution_id, ProgressEntry::before_step(index, total))
                .await;

            if !self.executions.heartbeat(execution_id).await? {
                return Err(ExecutionError::Interrupted(execution_id));
            }

            debug!(
                "Execution {}: step {}/{} '{}' ({})",
                execution_id,
                index + 1,
                total,
                step.id,
                step.step_type
            );

            let output = {
                let _lease = self.keep_alive(execution_id);
                self.executor
                    .execute_step(step, input_data, &results)
                    .await?
            };

            results.insert(step.id.clone(), output);
        }

        Ok(results)
    }

    async fn complete(&self, execution_id: Uuid, results: StepResults, elapsed: Duration) {
        let execution = match self
            .executions
            .update(execution_id, ExecutionStatus::Completed, Some(results), None)
            .await
        {
            Ok(execution) => execution,
            Err(StoreError::InvalidTransition(e)) => {
                warn!("Execution {} finished its steps but {}", execution_id, e);
                return;
            }
            Err(e) => {
                error!("Failed to persist completion of execution {}: {}", execution_id, e);
                return;
            }
        };

        self.publish(execution_id, ProgressEntry::finished(ExecutionStatus::Completed))
            .await;

        let usage = UsageRecord::for_execution(&execution, elapsed);
        if let Err(e) = self.executions.record_usage(&usage).await {
            error!("Failed to record usage for execution {}: {}", execution_id, e);
        }

        info!("Execution {} completed in {:?}", execution_id, elapsed);
    }

    async fn fail(&self, execution_id: Uuid, cause: ExecutionError) {
        warn!("Execution {} failed: {}", execution_id, cause);

        match self
            .executions
            .update(
                execution_id,
                ExecutionStatus::Failed,
                None,
                Some(cause.to_string()),
            )
            .await
        {
            Ok(_) => {
                self.publish(execution_id, ProgressEntry::finished(ExecutionStatus::Failed))
                    .await;
            }
            Err(StoreError::InvalidTransition(e)) => {
                warn!("Not recording failure of execution {}: {}", execution_id, e);
            }
            Err(e) => {
                error!("Failed to persist failure of execution {}: {}", execution_id, e);
            }
        }
    }

    /// Cache writes are best effort
    async fn publish(&self, execution_id: Uuid, entry: ProgressEntry) {
        if let Err(e) = self
            .progress
            .set(execution_id, entry, self.settings.progress_ttl)
            .await
        {
            warn!("Failed to cache progress of execution {}: {}", execution_id, e);
        }
    }

    /// Renews the lease every `heartbeat_interval` until the guard is dropped
    fn keep_alive(&self, execution_id: Uuid) -> LeaseGuard {
        let executions = Arc::clone(&self.executions);
        let period = self.settings.heartbeat_interval;

        LeaseGuard(tokio::spawn(async move {
            let mut ticker = time::interval(period);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                ticker.tick().await;

                match executions.heartbeat(execution_id).await {
                    Ok(true) => debug!("Renewed lease of execution {}", execution_id),
                    Ok(false) => break,
                    Err(e) => warn!("Failed to renew lease of execution {}: {}", execution_id, e),
                }
            }
        }))
    }
}

struct LeaseGuard(JoinHandle<()>);

impl Drop for LeaseGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}
