//! Execution Repository
//!
//! Handles all database operations related to pipeline executions.
//! Status changes are conditional on the current status so that concurrent
//! writers (runner, cancel, reconciler) cannot overwrite a terminal state.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;
use templatelab_core::domain::execution::{Execution, ExecutionStatus, InputData, StepResults};
use uuid::Uuid;

/// Insert a new execution
pub async fn create(pool: &PgPool, execution: &Execution) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO pipeline_executions
            (id, template_id, user_id, input_data, status, started_at, heartbeat_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(execution.id)
    .bind(execution.template_id)
    .bind(execution.user_id)
    .bind(Json(&execution.input_data))
    .bind(execution.status.as_str())
    .bind(execution.started_at)
    .bind(execution.heartbeat_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Find an execution by ID
pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Execution>, sqlx::Error> {
    let row = sqlx::query_as::<_, ExecutionRow>(
        r#"
        SELECT id, template_id, user_id, input_data, status, results,
               error_message, started_at, completed_at, heartbeat_at
        FROM pipeline_executions
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| r.into()))
}

/// Move an execution from `from` to `to`
///
/// Returns `false` when the row no longer has status `from`. `completed_at`
/// is stamped when `to` is terminal.
pub async fn transition(
    pool: &PgPool,
    id: Uuid,
    from: ExecutionStatus,
    to: ExecutionStatus,
    results: Option<&StepResults>,
    error_message: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let completed_at = to.is_terminal().then(Utc::now);

    let result = sqlx::query(
        r#"
        UPDATE pipeline_executions
        SET status = $1,
            results = $2,
            error_message = $3,
            completed_at = COALESCE($4, completed_at)
        WHERE id = $5 AND status = $6
        "#,
    )
    .bind(to.as_str())
    .bind(results.map(Json))
    .bind(error_message)
    .bind(completed_at)
    .bind(id)
    .bind(from.as_str())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Renew the lease of a running execution
///
/// Returns `false` when the execution is not running anymore.
pub async fn touch_heartbeat(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE pipeline_executions
        SET heartbeat_at = $1
        WHERE id = $2 AND status = $3
        "#,
    )
    .bind(Utc::now())
    .bind(id)
    .bind(ExecutionStatus::Running.as_str())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Fail running executions whose lease is older than `cutoff`
///
/// Returns the IDs of the executions that were failed.
pub async fn fail_stale(
    pool: &PgPool,
    cutoff: DateTime<Utc>,
    error_message: &str,
) -> Result<Vec<Uuid>, sqlx::Error> {
    let ids = sqlx::query_scalar::<_, Uuid>(
        r#"
        UPDATE pipeline_executions
        SET status = $1, error_message = $2, completed_at = $3
        WHERE status = $4 AND heartbeat_at < $5
        RETURNING id
        "#,
    )
    .bind(ExecutionStatus::Failed.as_str())
    .bind(error_message)
    .bind(Utc::now())
    .bind(ExecutionStatus::Running.as_str())
    .bind(cutoff)
    .fetch_all(pool)
    .await?;

    Ok(ids)
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct ExecutionRow {
    id: Uuid,
    template_id: Uuid,
    user_id: Uuid,
    input_data: Json<InputData>,
    status: String,
    results: Option<Json<StepResults>>,
    error_message: Option<String>,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    heartbeat_at: DateTime<Utc>,
}

impl From<ExecutionRow> for Execution {
    fn from(row: ExecutionRow) -> Self {
        let status = row.status.parse().unwrap_or_else(|e| {
            tracing::warn!("Execution {} has {}; treating as failed", row.id, e);
            ExecutionStatus::Failed
        });

        Execution {
            id: row.id,
            template_id: row.template_id,
            user_id: row.user_id,
            input_data: row.input_data.0,
            status,
            results: row.results.map(|r| r.0),
            error_message: row.error_message,
            started_at: row.started_at,
            completed_at: row.completed_at,
            heartbeat_at: row.heartbeat_at,
        }
    }
}
