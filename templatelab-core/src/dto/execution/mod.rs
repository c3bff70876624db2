//! Execution DTOs

use serde::{Deserialize, Serialize};

use crate::domain::execution::{Execution, ExecutionStatus};
use crate::domain::progress::ProgressEntry;

/// Durable execution record merged with its live progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionView {
    #[serde(flatten)]
    pub execution: Execution,
    /// Percentage from the progress cache; absent when unknown
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
}

impl ExecutionView {
    /// Merges a cache entry (if any) into the durable record
    ///
    /// The durable status always wins. A cache entry that disagrees with it
    /// is stale and ignored; a completed execution reports 100 even after its
    /// cache entry expired.
    pub fn merge(execution: Execution, live: Option<ProgressEntry>) -> Self {
        let progress = match live {
            Some(entry) if entry.status == execution.status => Some(entry.progress),
            _ if execution.status == ExecutionStatus::Completed => Some(100),
            _ if execution.status.is_terminal() => Some(0),
            _ => None,
        };

        Self {
            execution,
            progress,
        }
    }
}
