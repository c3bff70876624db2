//! HTTP provider for the AI gateway (images) and the video job API
//!
//! Images go through the OpenAI-compatible chat completions endpoint of the
//! gateway. Videos are asynchronous jobs: `POST {veo_url}` starts one and
//! `GET {veo_url}/jobs/{id}` reports its state.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};
use serde_json::{Value as JsonValue, json};
use templatelab_core::domain::capability::{
    DEFAULT_VIDEO_DURATION, ImageAnalysis, ImageAnalysisRequest, ImageGeneration,
    ImageGenerationRequest, VideoGeneration, VideoGenerationRequest, VideoStatus,
};

use super::{
    CapabilityProvider, IMAGE_GENERATION_FAILED, ProviderError, VIDEO_GENERATION_FAILED,
    VIDEO_STATUS_FAILED,
};
use crate::config::BackendConfig;

const DEFAULT_IMAGE_MODEL: &str = "google/gemini-2.5-flash-image-preview";
const DEFAULT_ANALYSIS_MODEL: &str = "google/gemini-2.5-flash";
const DEFAULT_VIDEO_MODEL: &str = "veo3-default";

pub struct GatewayProvider {
    client: Client,
    gemini: BackendConfig,
    veo: BackendConfig,
}

impl GatewayProvider {
    pub fn new(
        gemini: BackendConfig,
        veo: BackendConfig,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, gemini, veo })
    }

    async fn chat_completion(&self, body: JsonValue) -> Result<JsonValue, reqwest::Error> {
        let request = self
            .client
            .post(&self.gemini.api_url)
            .bearer_auth(&self.gemini.api_key)
            .json(&body);

        send_json(request).await
    }

    fn veo_url(&self) -> Option<&str> {
        let url = self.veo.api_url.trim_end_matches('/');
        (!url.is_empty()).then_some(url)
    }
}

#[async_trait]
impl CapabilityProvider for GatewayProvider {
    async fn generate_image(
        &self,
        request: ImageGenerationRequest,
    ) -> Result<ImageGeneration, ProviderError> {
        // The chat completions API has no size parameter.
        if request.width.is_some() || request.height.is_some() {
            tracing::debug!(
                "Ignoring requested size {:?}x{:?} for gateway image generation",
                request.width,
                request.height
            );
        }

        let body = json!({
            "model": request.model.as_deref().unwrap_or(DEFAULT_IMAGE_MODEL),
            "messages": [{ "role": "user", "content": request.prompt }],
            "modalities": ["image", "text"],
        });

        let response = self.chat_completion(body).await.map_err(|e| {
            tracing::error!("Image generation request failed: {}", e);
            ProviderError::generation(IMAGE_GENERATION_FAILED)
        })?;

        let image_url = extract_image_url(&response).ok_or_else(|| {
            tracing::error!("Image generation response carried no image");
            ProviderError::generation(IMAGE_GENERATION_FAILED)
        })?;

        Ok(ImageGeneration {
            image_url,
            generation_id: synthesized_id("gen"),
        })
    }

    async fn analyze_image(
        &self,
        request: ImageAnalysisRequest,
    ) -> Result<ImageAnalysis, ProviderError> {
        let body = json!({
            "model": request.model.as_deref().unwrap_or(DEFAULT_ANALYSIS_MODEL),
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": request.prompt },
                    { "type": "image_url", "image_url": { "url": request.image_url } },
                ],
            }],
        });

        let response = self.chat_completion(body).await.map_err(|e| {
            tracing::error!("Image analysis request failed: {}", e);
            ProviderError::analysis()
        })?;

        let analysis = extract_analysis(&response).ok_or_else(|| {
            tracing::error!("Image analysis response carried no content");
            ProviderError::analysis()
        })?;

        Ok(ImageAnalysis {
            analysis,
            metadata: Default::default(),
        })
    }

    async fn generate_video(
        &self,
        request: VideoGenerationRequest,
    ) -> Result<VideoGeneration, ProviderError> {
        let Some(url) = self.veo_url() else {
            tracing::error!("Video generation requested but VEO3_API_URL is not configured");
            return Err(ProviderError::generation(VIDEO_GENERATION_FAILED));
        };

        let body = json!({
            "prompt": request.prompt,
            "duration": request.duration.unwrap_or(DEFAULT_VIDEO_DURATION),
            "inputImage": request.input_image_url,
            "model": request.model.as_deref().unwrap_or(DEFAULT_VIDEO_MODEL),
        });

        let request = self
            .client
            .post(url)
            .bearer_auth(&self.veo.api_key)
            .json(&body);

        let response = send_json(request).await.map_err(|e| {
            tracing::error!("Video generation request failed: {}", e);
            ProviderError::generation(VIDEO_GENERATION_FAILED)
        })?;

        Ok(VideoGeneration {
            video_url: String::new(),
            generation_id: extract_job_id(&response).unwrap_or_else(|| synthesized_id("video")),
            status: VideoStatus::Processing,
        })
    }

    async fn check_video_status(
        &self,
        generation_id: &str,
    ) -> Result<VideoGeneration, ProviderError> {
        let Some(url) = self.veo_url() else {
            tracing::error!("Video status requested but VEO3_API_URL is not configured");
            return Err(ProviderError::generation(VIDEO_STATUS_FAILED));
        };

        let Some(status_url) = video_status_url(url, generation_id) else {
            tracing::error!("Rejected video job id {:?}", generation_id);
            return Err(ProviderError::generation(VIDEO_STATUS_FAILED));
        };

        let request = self
            .client
            .get(status_url)
            .bearer_auth(&self.veo.api_key);

        let response = send_json(request).await.map_err(|e| {
            tracing::error!("Video status request for {} failed: {}", generation_id, e);
            ProviderError::generation(VIDEO_STATUS_FAILED)
        })?;

        parse_video_status(generation_id, &response).ok_or_else(|| {
            tracing::error!("Video status response for {} is malformed", generation_id);
            ProviderError::generation(VIDEO_STATUS_FAILED)
        })
    }
}

/// `{base}/jobs/{id}` with the id kept as a single encoded path segment
fn video_status_url(base: &str, generation_id: &str) -> Option<Url> {
    if matches!(generation_id, "" | "." | "..") {
        return None;
    }

    let mut url = Url::parse(base).ok()?;
    url.path_segments_mut()
        .ok()?
        .pop_if_empty()
        .push("jobs")
        .push(generation_id);

    Some(url)
}

async fn send_json(request: RequestBuilder) -> Result<JsonValue, reqwest::Error> {
    request
        .send()
        .await?
        .error_for_status()?
        .json::<JsonValue>()
        .await
}

// =============================================================================
// Response parsing
// =============================================================================

fn non_empty_str(value: &JsonValue) -> Option<String> {
    value
        .as_str()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn extract_image_url(response: &JsonValue) -> Option<String> {
    response
        .pointer("/choices/0/message/images/0/image_url/url")
        .and_then(non_empty_str)
}

fn extract_analysis(response: &JsonValue) -> Option<String> {
    response
        .pointer("/choices/0/message/content")
        .and_then(non_empty_str)
}

fn extract_job_id(response: &JsonValue) -> Option<String> {
    response.get("jobId").and_then(non_empty_str)
}

fn parse_video_status(generation_id: &str, response: &JsonValue) -> Option<VideoGeneration> {
    let status = response
        .get("status")
        .cloned()
        .and_then(|s| serde_json::from_value::<VideoStatus>(s).ok())?;

    Some(VideoGeneration {
        video_url: response
            .get("videoUrl")
            .and_then(non_empty_str)
            .unwrap_or_default(),
        generation_id: generation_id.to_string(),
        status,
    })
}

fn synthesized_id(prefix: &str) -> String {
    format!("{}_{}", prefix, chrono::Utc::now().timestamp_millis())
}
