//! Execution API Handlers
//!
//! HTTP endpoints for launching, observing and cancelling executions.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Serialize;
use templatelab_core::domain::execution::{Execution, InputData};
use templatelab_core::dto::execution::ExecutionView;
use uuid::Uuid;

use crate::api::auth::UserId;
use crate::api::error::ApiResult;
use crate::api::{AppState, Envelope};

#[derive(Debug, Serialize)]
pub struct ExecutionData<T> {
    pub execution: T,
}

/// POST /templates/{template_id}/execute
/// Launch the template's pipeline; the body is the execution's input data
/// (no body means no input)
pub async fn execute_pipeline(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(template_id): Path<Uuid>,
    body: Option<Json<InputData>>,
) -> ApiResult<(StatusCode, Json<Envelope<ExecutionData<Execution>>>)> {
    let input_data = body.map(|Json(input)| input).unwrap_or_default();

    tracing::info!("Executing pipeline of template {} for user {}", template_id, user_id);

    let execution = state
        .launcher
        .launch(template_id, user_id, input_data)
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Envelope::success(ExecutionData { execution }),
    ))
}

/// GET /executions/{execution_id}
/// Get an execution merged with its live progress
pub async fn get_execution(
    State(state): State<AppState>,
    UserId(_): UserId,
    Path(execution_id): Path<Uuid>,
) -> ApiResult<Json<Envelope<ExecutionData<ExecutionView>>>> {
    tracing::debug!("Getting execution: {}", execution_id);

    let execution = state.launcher.status(execution_id).await?;

    Ok(Envelope::success(ExecutionData { execution }))
}

/// POST /executions/{execution_id}/cancel
/// Cancel a pending or running execution
pub async fn cancel_execution(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(execution_id): Path<Uuid>,
) -> ApiResult<Json<Envelope<ExecutionData<Execution>>>> {
    tracing::info!("Cancelling execution {} (user {})", execution_id, user_id);

    let execution = state.launcher.cancel(execution_id).await?;

    Ok(Envelope::success(ExecutionData { execution }))
}
