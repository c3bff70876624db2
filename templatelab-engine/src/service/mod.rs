//! Service Module
//!
//! Business logic of the engine: running pipelines, launching and observing
//! executions, reconciling abandoned ones and managing pipeline definitions.

pub mod error;
pub mod launcher;
pub mod pipeline;
pub mod reconciler;
pub mod runner;
pub mod step_executor;

pub use error::ExecutionError;
pub use launcher::ExecutionLauncher;
pub use reconciler::OrphanReconciler;
pub use runner::{PipelineRunner, RunnerSettings};
pub use step_executor::StepExecutor;
