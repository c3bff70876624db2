//! Usage Repository
//!
//! Persists usage records emitted for completed executions.

use sqlx::PgPool;
use templatelab_core::domain::usage::UsageRecord;

/// Insert a usage record
pub async fn create(pool: &PgPool, usage: &UsageRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO template_usage
            (id, template_id, user_id, execution_id, credits_used, execution_time_ms)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(usage.id)
    .bind(usage.template_id)
    .bind(usage.user_id)
    .bind(usage.execution_id)
    .bind(usage.credits_used)
    .bind(usage.execution_time_ms)
    .execute(pool)
    .await?;

    Ok(())
}
