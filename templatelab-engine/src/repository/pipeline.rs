//! Pipeline Repository
//!
//! Handles all database operations related to pipelines. A template owns at
//! most one pipeline; steps are stored as an ordered JSON array.

use sqlx::PgPool;
use sqlx::types::Json;
use templatelab_core::domain::pipeline::{Pipeline, Step};
use uuid::Uuid;

/// Find the pipeline owned by a template
pub async fn find_by_template(
    pool: &PgPool,
    template_id: Uuid,
) -> Result<Option<Pipeline>, sqlx::Error> {
    let row = sqlx::query_as::<_, PipelineRow>(
        r#"
        SELECT id, template_id, name, description, steps
        FROM pipelines
        WHERE template_id = $1
        "#,
    )
    .bind(template_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| r.into()))
}

/// Insert the template's pipeline or replace its definition
///
/// The stored pipeline keeps its original ID on replace; the returned value
/// carries the ID actually persisted.
pub async fn upsert(pool: &PgPool, pipeline: &Pipeline) -> Result<Pipeline, sqlx::Error> {
    let now = chrono::Utc::now();

    let id = sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO pipelines (id, template_id, name, description, steps, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $6)
        ON CONFLICT (template_id) DO UPDATE
        SET name = EXCLUDED.name,
            description = EXCLUDED.description,
            steps = EXCLUDED.steps,
            updated_at = EXCLUDED.updated_at
        RETURNING id
        "#,
    )
    .bind(pipeline.id)
    .bind(pipeline.template_id)
    .bind(&pipeline.name)
    .bind(&pipeline.description)
    .bind(Json(&pipeline.steps))
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(Pipeline {
        id,
        ..pipeline.clone()
    })
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct PipelineRow {
    id: Uuid,
    template_id: Uuid,
    name: String,
    description: Option<String>,
    steps: Json<Vec<Step>>,
}

impl From<PipelineRow> for Pipeline {
    fn from(row: PipelineRow) -> Self {
        Pipeline {
            id: row.id,
            template_id: row.template_id,
            name: row.name,
            description: row.description,
            steps: row.steps.0,
        }
    }
}
