//! Execution domain types
//!
//! An execution is one run of a pipeline against specific input data. Its
//! lifecycle is an explicit state machine:
//!
//! ```text
//! pending ──▶ running ──▶ completed | failed | cancelled
//!    └──────────────────▶ completed | failed | cancelled
//! ```
//!
//! Terminal states never transition again.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Runtime input supplied by the caller, referenced by step configs
pub type InputData = HashMap<String, serde_json::Value>;

/// Step outputs keyed by step id
pub type StepResults = HashMap<String, serde_json::Value>;

/// Error message recorded when the reconciler fails an abandoned execution
pub const ORPHANED_MESSAGE: &str = "Orphaned: execution lease expired without a heartbeat";

/// Execution record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    pub id: Uuid,
    pub template_id: Uuid,
    pub user_id: Uuid,
    pub input_data: InputData,
    pub status: ExecutionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<StepResults>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Lease renewed by the runner while the execution is in flight
    pub heartbeat_at: DateTime<Utc>,
}

impl Execution {
    /// A fresh execution, already running
    pub fn start(template_id: Uuid, user_id: Uuid, input_data: InputData) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            template_id,
            user_id,
            input_data,
            status: ExecutionStatus::Running,
            results: None,
            error_message: None,
            started_at: now,
            completed_at: None,
            heartbeat_at: now,
        }
    }
}

/// Execution lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl ExecutionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionStatus::Completed | ExecutionStatus::Failed | ExecutionStatus::Cancelled
        )
    }

    pub fn can_transition_to(&self, next: ExecutionStatus) -> bool {
        use ExecutionStatus::*;

        match (self, next) {
            (Pending, Running) => true,
            (Pending | Running, Completed | Failed | Cancelled) => true,
            _ => false,
        }
    }

    /// Validates a transition, returning the target status on success
    pub fn transition_to(&self, next: ExecutionStatus) -> Result<ExecutionStatus, TransitionError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(TransitionError {
                from: *self,
                to: next,
            })
        }
    }

    pub const ALL: [ExecutionStatus; 5] = [
        ExecutionStatus::Pending,
        ExecutionStatus::Running,
        ExecutionStatus::Completed,
        ExecutionStatus::Failed,
        ExecutionStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Pending => "pending",
            ExecutionStatus::Running => "running",
            ExecutionStatus::Completed => "completed",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ExecutionStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown execution status: {s}"))
    }
}

/// Rejected lifecycle transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Cannot transition execution from {from} to {to}")]
pub struct TransitionError {
    pub from: ExecutionStatus,
    pub to: ExecutionStatus,
}
