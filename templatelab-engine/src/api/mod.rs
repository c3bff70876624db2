//! API Module
//!
//! HTTP API layer of the engine. Handlers are thin wrappers over the
//! service layer; successful responses use the `{status, data}` envelope.

pub mod auth;
pub mod error;
pub mod execution;
pub mod health;
pub mod pipeline;
pub mod video;

use std::sync::Arc;

use axum::{
    Json, Router,
    routing::{get, post},
};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::provider::CapabilityProvider;
use crate::service::ExecutionLauncher;
use crate::store::PipelineStore;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub launcher: Arc<ExecutionLauncher>,
    pub pipelines: Arc<dyn PipelineStore>,
    pub provider: Arc<dyn CapabilityProvider>,
}

/// Success envelope
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub status: &'static str,
    pub data: T,
}

impl<T: Serialize> Envelope<T> {
    pub fn success(data: T) -> Json<Self> {
        Json(Self {
            status: "success",
            data,
        })
    }
}

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Pipeline endpoints
        .route(
            "/templates/{template_id}/pipeline",
            get(pipeline::get_pipeline).put(pipeline::save_pipeline),
        )
        .route(
            "/templates/{template_id}/execute",
            post(execution::execute_pipeline),
        )
        // Execution endpoints
        .route("/executions/{execution_id}", get(execution::get_execution))
        .route(
            "/executions/{execution_id}/cancel",
            post(execution::cancel_execution),
        )
        // Video jobs
        .route("/videos/{generation_id}", get(video::get_video_status))
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
