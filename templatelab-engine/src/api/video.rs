//! Video API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;
use templatelab_core::domain::capability::VideoGeneration;

use crate::api::auth::UserId;
use crate::api::error::ApiResult;
use crate::api::{AppState, Envelope};
use crate::service::ExecutionError;

#[derive(Debug, Serialize)]
pub struct VideoData {
    pub video: VideoGeneration,
}

/// GET /videos/{generation_id}
/// Poll the state of a video job started by a pipeline step
pub async fn get_video_status(
    State(state): State<AppState>,
    UserId(_): UserId,
    Path(generation_id): Path<String>,
) -> ApiResult<Json<Envelope<VideoData>>> {
    tracing::debug!("Checking video job: {}", generation_id);

    let video = state
        .provider
        .check_video_status(&generation_id)
        .await
        .map_err(ExecutionError::from)?;

    Ok(Envelope::success(VideoData { video }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::{ExecutionLauncher, PipelineRunner, RunnerSettings, StepExecutor};
    use crate::testing::{
        MemoryExecutionStore, MemoryPipelineStore, RecordingProgressCache, ScriptedProvider,
    };
    use std::sync::Arc;
    use std::time::Duration;
    use templatelab_core::domain::capability::VideoStatus;
    use uuid::Uuid;

    fn state(provider: Arc<ScriptedProvider>) -> AppState {
        let executions = Arc::new(MemoryExecutionStore::new());
        let pipelines = Arc::new(MemoryPipelineStore::new());
        let progress = Arc::new(RecordingProgressCache::new());

        let runner = Arc::new(PipelineRunner::new(
            executions.clone(),
            pipelines.clone(),
            progress.clone(),
            StepExecutor::new(provider.clone()),
            RunnerSettings {
                progress_ttl: Duration::from_secs(60),
                heartbeat_interval: Duration::from_secs(15),
            },
        ));

        AppState {
            launcher: Arc::new(ExecutionLauncher::new(executions, progress, runner)),
            pipelines,
            provider,
        }
    }

    #[tokio::test]
    async fn test_video_status_passthrough() {
        let provider = Arc::new(ScriptedProvider::new());
        provider.set_video_status(VideoStatus::Completed);

        let Json(body) = get_video_status(
            State(state(provider.clone())),
            UserId(Uuid::new_v4()),
            Path("video_7".to_string()),
        )
        .await
        .unwrap();

        assert_eq!(body.status, "success");
        assert_eq!(body.data.video.status, VideoStatus::Completed);
        assert_eq!(body.data.video.video_url, "https://videos.test/video_7.mp4");
        assert_eq!(provider.calls(), vec!["check_video_status"]);
    }
}
