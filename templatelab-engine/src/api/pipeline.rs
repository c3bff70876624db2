//! Pipeline API Handlers
//!
//! HTTP endpoints for a template's pipeline definition.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;
use templatelab_core::domain::pipeline::Pipeline;
use templatelab_core::dto::pipeline::SavePipeline;
use uuid::Uuid;

use crate::api::auth::UserId;
use crate::api::error::ApiResult;
use crate::api::{AppState, Envelope};
use crate::service::pipeline as pipeline_service;

#[derive(Debug, Serialize)]
pub struct PipelineData {
    pub pipeline: Pipeline,
}

/// PUT /templates/{template_id}/pipeline
/// Validate and save the template's pipeline
pub async fn save_pipeline(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(template_id): Path<Uuid>,
    Json(req): Json<SavePipeline>,
) -> ApiResult<Json<Envelope<PipelineData>>> {
    tracing::info!(
        "Saving pipeline '{}' for template {} (user {})",
        req.name,
        template_id,
        user_id
    );

    let pipeline =
        pipeline_service::save_pipeline(state.pipelines.as_ref(), template_id, req).await?;

    Ok(Envelope::success(PipelineData { pipeline }))
}

/// GET /templates/{template_id}/pipeline
/// Get the template's pipeline
pub async fn get_pipeline(
    State(state): State<AppState>,
    Path(template_id): Path<Uuid>,
) -> ApiResult<Json<Envelope<PipelineData>>> {
    tracing::debug!("Getting pipeline of template: {}", template_id);

    let pipeline = pipeline_service::get_pipeline(state.pipelines.as_ref(), template_id).await?;

    Ok(Envelope::success(PipelineData { pipeline }))
}
