//! Usage records emitted for billing and analytics

use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::domain::execution::Execution;

/// Credits charged per completed execution
pub const FLAT_RATE_CREDITS: i32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub id: Uuid,
    pub template_id: Uuid,
    pub user_id: Uuid,
    pub execution_id: Uuid,
    pub credits_used: i32,
    pub execution_time_ms: i64,
}

impl UsageRecord {
    /// Usage of a completed execution that took `elapsed` wall-clock time
    pub fn for_execution(execution: &Execution, elapsed: Duration) -> Self {
        Self {
            id: Uuid::new_v4(),
            template_id: execution.template_id,
            user_id: execution.user_id,
            execution_id: execution.id,
            credits_used: FLAT_RATE_CREDITS,
            execution_time_ms: i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX),
        }
    }
}
