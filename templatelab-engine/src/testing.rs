//! In-memory doubles for the engine's trait seams

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value as JsonValue;
use templatelab_core::domain::capability::{
    ImageAnalysis, ImageAnalysisRequest, ImageGeneration, ImageGenerationRequest,
    VideoGeneration, VideoGenerationRequest, VideoStatus,
};
use templatelab_core::domain::execution::{
    Execution, ExecutionStatus, ORPHANED_MESSAGE, StepResults,
};
use templatelab_core::domain::pipeline::{Pipeline, Step};
use templatelab_core::domain::progress::ProgressEntry;
use templatelab_core::domain::usage::UsageRecord;
use tokio::sync::Notify;
use uuid::Uuid;

use crate::provider::{
    CapabilityProvider, IMAGE_GENERATION_FAILED, ProviderError, VIDEO_GENERATION_FAILED,
};
use crate::store::{CacheError, ExecutionStore, PipelineStore, ProgressCache, StoreError};

pub fn step(id: &str, step_type: &str, config: JsonValue) -> Step {
    Step {
        id: id.to_string(),
        order: 0,
        step_type: step_type.to_string(),
        config: config.as_object().cloned().unwrap_or_default(),
        depends_on_step_id: None,
    }
}

pub fn pipeline(template_id: Uuid, steps: Vec<Step>) -> Pipeline {
    Pipeline {
        id: Uuid::new_v4(),
        template_id,
        name: "test pipeline".to_string(),
        description: None,
        steps,
    }
}

// =============================================================================
// Stores
// =============================================================================

/// Execution store with the same state-machine guard as the Postgres one
#[derive(Default)]
pub struct MemoryExecutionStore {
    executions: Mutex<HashMap<Uuid, Execution>>,
    usage: Mutex<Vec<UsageRecord>>,
}

impl MemoryExecutionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self, id: Uuid) -> Option<Execution> {
        self.executions.lock().unwrap().get(&id).cloned()
    }

    pub fn set_heartbeat(&self, id: Uuid, at: chrono::DateTime<Utc>) {
        if let Some(execution) = self.executions.lock().unwrap().get_mut(&id) {
            execution.heartbeat_at = at;
        }
    }

    pub fn usage(&self) -> Vec<UsageRecord> {
        self.usage.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExecutionStore for MemoryExecutionStore {
    async fn create(&self, execution: &Execution) -> Result<(), StoreError> {
        let mut executions = self.executions.lock().unwrap();
        if executions.contains_key(&execution.id) {
            return Err(StoreError::Conflict(execution.id));
        }
        executions.insert(execution.id, execution.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Execution, StoreError> {
        self.snapshot(id).ok_or(StoreError::NotFound(id))
    }

    async fn update(
        &self,
        id: Uuid,
        status: ExecutionStatus,
        results: Option<StepResults>,
        error_message: Option<String>,
    ) -> Result<Execution, StoreError> {
        let mut executions = self.executions.lock().unwrap();
        let execution = executions.get_mut(&id).ok_or(StoreError::NotFound(id))?;

        execution.status = execution.status.transition_to(status)?;
        execution.results = results;
        execution.error_message = error_message;
        if status.is_terminal() {
            execution.completed_at = Some(Utc::now());
        }

        Ok(execution.clone())
    }

    async fn heartbeat(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut executions = self.executions.lock().unwrap();
        match executions.get_mut(&id) {
            Some(execution) if execution.status == ExecutionStatus::Running => {
                execution.heartbeat_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn fail_orphaned(&self, lease_timeout: Duration) -> Result<Vec<Uuid>, StoreError> {
        let cutoff = Utc::now() - chrono::Duration::from_std(lease_timeout).unwrap();
        let mut executions = self.executions.lock().unwrap();

        let mut failed = Vec::new();
        for execution in executions.values_mut() {
            if execution.status == ExecutionStatus::Running && execution.heartbeat_at < cutoff {
                execution.status = ExecutionStatus::Failed;
                execution.error_message = Some(ORPHANED_MESSAGE.to_string());
                execution.completed_at = Some(Utc::now());
                failed.push(execution.id);
            }
        }

        Ok(failed)
    }

    async fn record_usage(&self, usage: &UsageRecord) -> Result<(), StoreError> {
        self.usage.lock().unwrap().push(usage.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryPipelineStore {
    pipelines: Mutex<HashMap<Uuid, Pipeline>>,
}

impl MemoryPipelineStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(pipeline: Pipeline) -> Self {
        let store = Self::default();
        store
            .pipelines
            .lock()
            .unwrap()
            .insert(pipeline.template_id, pipeline);
        store
    }
}

#[async_trait]
impl PipelineStore for MemoryPipelineStore {
    async fn find_by_template(&self, template_id: Uuid) -> Result<Option<Pipeline>, StoreError> {
        Ok(self.pipelines.lock().unwrap().get(&template_id).cloned())
    }

    async fn save(&self, pipeline: &Pipeline) -> Result<Pipeline, StoreError> {
        let mut pipelines = self.pipelines.lock().unwrap();
        let id = pipelines
            .get(&pipeline.template_id)
            .map(|existing| existing.id)
            .unwrap_or(pipeline.id);

        let saved = Pipeline {
            id,
            ..pipeline.clone()
        };
        pipelines.insert(saved.template_id, saved.clone());
        Ok(saved)
    }
}

/// Progress cache that keeps every entry it was given
#[derive(Default)]
pub struct RecordingProgressCache {
    history: Mutex<Vec<(Uuid, ProgressEntry)>>,
    broken: AtomicBool,
}

impl RecordingProgressCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every subsequent call fails
    pub fn break_cache(&self) {
        self.broken.store(true, Ordering::SeqCst);
    }

    pub fn history(&self, id: Uuid) -> Vec<ProgressEntry> {
        self.history
            .lock()
            .unwrap()
            .iter()
            .filter(|(entry_id, _)| *entry_id == id)
            .map(|(_, entry)| *entry)
            .collect()
    }

    fn check(&self) -> Result<(), CacheError> {
        if self.broken.load(Ordering::SeqCst) {
            let err = serde_json::from_str::<ProgressEntry>("not json").unwrap_err();
            return Err(CacheError::Serialization(err));
        }
        Ok(())
    }
}

#[async_trait]
impl ProgressCache for RecordingProgressCache {
    async fn set(&self, id: Uuid, entry: ProgressEntry, _ttl: Duration) -> Result<(), CacheError> {
        self.check()?;
        self.history.lock().unwrap().push((id, entry));
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<ProgressEntry>, CacheError> {
        self.check()?;
        Ok(self.history(id).last().copied())
    }
}

// =============================================================================
// Provider
// =============================================================================

/// Pauses the provider inside `generate_image` until released
#[derive(Default)]
pub struct Gate {
    pub entered: Notify,
    pub release: Notify,
}

/// Deterministic provider that records every request it receives
pub struct ScriptedProvider {
    calls: Mutex<Vec<String>>,
    image_requests: Mutex<Vec<ImageGenerationRequest>>,
    analysis_requests: Mutex<Vec<ImageAnalysisRequest>>,
    video_requests: Mutex<Vec<VideoGenerationRequest>>,
    fail_images: AtomicBool,
    fail_videos: AtomicBool,
    video_status: Mutex<VideoStatus>,
    gate: Option<std::sync::Arc<Gate>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            calls: Mutex::default(),
            image_requests: Mutex::default(),
            analysis_requests: Mutex::default(),
            video_requests: Mutex::default(),
            fail_images: AtomicBool::new(false),
            fail_videos: AtomicBool::new(false),
            video_status: Mutex::new(VideoStatus::Processing),
            gate: None,
        }
    }

    pub fn gated(gate: std::sync::Arc<Gate>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new()
        }
    }

    pub fn fail_images(&self) {
        self.fail_images.store(true, Ordering::SeqCst);
    }

    pub fn fail_videos(&self) {
        self.fail_videos.store(true, Ordering::SeqCst);
    }

    pub fn set_video_status(&self, status: VideoStatus) {
        *self.video_status.lock().unwrap() = status;
    }

    /// Operation names in call order, e.g. `["generate_image", "analyze_image"]`
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn image_requests(&self) -> Vec<ImageGenerationRequest> {
        self.image_requests.lock().unwrap().clone()
    }

    pub fn analysis_requests(&self) -> Vec<ImageAnalysisRequest> {
        self.analysis_requests.lock().unwrap().clone()
    }

    pub fn video_requests(&self) -> Vec<VideoGenerationRequest> {
        self.video_requests.lock().unwrap().clone()
    }

    fn record(&self, operation: &str) {
        self.calls.lock().unwrap().push(operation.to_string());
    }
}

#[async_trait]
impl CapabilityProvider for ScriptedProvider {
    async fn generate_image(
        &self,
        request: ImageGenerationRequest,
    ) -> Result<ImageGeneration, ProviderError> {
        self.record("generate_image");
        let n = {
            let mut requests = self.image_requests.lock().unwrap();
            requests.push(request);
            requests.len()
        };

        if let Some(gate) = &self.gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }

        if self.fail_images.load(Ordering::SeqCst) {
            return Err(ProviderError::generation(IMAGE_GENERATION_FAILED));
        }

        Ok(ImageGeneration {
            image_url: format!("https://images.test/{n}.png"),
            generation_id: format!("gen_{n}"),
        })
    }

    async fn analyze_image(
        &self,
        request: ImageAnalysisRequest,
    ) -> Result<ImageAnalysis, ProviderError> {
        self.record("analyze_image");
        let analysis = format!("analysis of {}", request.image_url);
        self.analysis_requests.lock().unwrap().push(request);

        Ok(ImageAnalysis {
            analysis,
            metadata: Default::default(),
        })
    }

    async fn generate_video(
        &self,
        request: VideoGenerationRequest,
    ) -> Result<VideoGeneration, ProviderError> {
        self.record("generate_video");
        let n = {
            let mut requests = self.video_requests.lock().unwrap();
            requests.push(request);
            requests.len()
        };

        if self.fail_videos.load(Ordering::SeqCst) {
            return Err(ProviderError::generation(VIDEO_GENERATION_FAILED));
        }

        Ok(VideoGeneration {
            video_url: String::new(),
            generation_id: format!("video_{n}"),
            status: VideoStatus::Processing,
        })
    }

    async fn check_video_status(
        &self,
        generation_id: &str,
    ) -> Result<VideoGeneration, ProviderError> {
        self.record("check_video_status");
        let status = *self.video_status.lock().unwrap();

        Ok(VideoGeneration {
            video_url: match status {
                VideoStatus::Completed => format!("https://videos.test/{generation_id}.mp4"),
                _ => String::new(),
            },
            generation_id: generation_id.to_string(),
            status,
        })
    }
}
