//! Live progress of an execution
//!
//! Progress entries live in an ephemeral, TTL-bounded cache. The durable
//! execution record stays the source of truth.

use serde::{Deserialize, Serialize};

use crate::domain::execution::ExecutionStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEntry {
    pub status: ExecutionStatus,
    /// Percentage, 0..=100
    pub progress: u8,
}

impl ProgressEntry {
    /// Progress published before running step `index` (0-based) of `total`
    pub fn before_step(index: usize, total: usize) -> Self {
        let progress = if total == 0 {
            0
        } else {
            (index.min(total) * 100 / total) as u8
        };

        Self {
            status: ExecutionStatus::Running,
            progress,
        }
    }

    /// Final entry for a status: 100 when completed, 0 otherwise
    pub fn finished(status: ExecutionStatus) -> Self {
        let progress = if status == ExecutionStatus::Completed {
            100
        } else {
            0
        };

        Self { status, progress }
    }
}
