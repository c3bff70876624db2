use sqlx::{PgPool, postgres::PgPoolOptions};
use std::time::Duration;

pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    // One pipeline per template
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pipelines (
            id UUID PRIMARY KEY,
            template_id UUID NOT NULL UNIQUE,
            name VARCHAR(255) NOT NULL,
            description TEXT,
            steps JSONB NOT NULL DEFAULT '[]',
            created_at TIMESTAMPTZ NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pipeline_executions (
            id UUID PRIMARY KEY,
            template_id UUID NOT NULL,
            user_id UUID NOT NULL,
            input_data JSONB NOT NULL DEFAULT '{}',
            status VARCHAR(20) NOT NULL,
            results JSONB,
            error_message TEXT,
            started_at TIMESTAMPTZ NOT NULL,
            completed_at TIMESTAMPTZ,
            heartbeat_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS template_usage (
            id UUID PRIMARY KEY,
            template_id UUID NOT NULL,
            user_id UUID NOT NULL,
            execution_id UUID NOT NULL REFERENCES pipeline_executions(id) ON DELETE CASCADE,
            credits_used INTEGER NOT NULL,
            execution_time_ms BIGINT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    // The reconciler scans running executions by lease age
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_executions_status_heartbeat ON pipeline_executions(status, heartbeat_at)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_executions_template_id ON pipeline_executions(template_id)",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_usage_template_id ON template_usage(template_id)")
        .execute(pool)
        .await?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}
