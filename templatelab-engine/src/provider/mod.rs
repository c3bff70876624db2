//! Capability providers
//!
//! Abstraction over the external generative and analytical backends. The
//! engine only sees [`CapabilityProvider`]; transport and parse details stay
//! inside the implementation and are logged there.

mod gateway;

pub use gateway::GatewayProvider;

use async_trait::async_trait;
use templatelab_core::domain::capability::{
    ImageAnalysis, ImageAnalysisRequest, ImageGeneration, ImageGenerationRequest,
    VideoGeneration, VideoGenerationRequest,
};
use thiserror::Error;

pub const IMAGE_GENERATION_FAILED: &str = "Image generation failed";
pub const VIDEO_GENERATION_FAILED: &str = "Video generation failed";
pub const VIDEO_STATUS_FAILED: &str = "Failed to check video status";
pub const IMAGE_ANALYSIS_FAILED: &str = "Image analysis failed";

/// Collapsed provider failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("{0}")]
    GenerationFailed(String),

    #[error("{0}")]
    AnalysisFailed(String),
}

impl ProviderError {
    pub fn generation(message: &str) -> Self {
        ProviderError::GenerationFailed(message.to_string())
    }

    pub fn analysis() -> Self {
        ProviderError::AnalysisFailed(IMAGE_ANALYSIS_FAILED.to_string())
    }
}

#[async_trait]
pub trait CapabilityProvider: Send + Sync {
    async fn generate_image(
        &self,
        request: ImageGenerationRequest,
    ) -> Result<ImageGeneration, ProviderError>;

    async fn analyze_image(
        &self,
        request: ImageAnalysisRequest,
    ) -> Result<ImageAnalysis, ProviderError>;

    /// Starts a video job; the result is normally still `processing`
    async fn generate_video(
        &self,
        request: VideoGenerationRequest,
    ) -> Result<VideoGeneration, ProviderError>;

    /// Polls a video job started by `generate_video`
    async fn check_video_status(
        &self,
        generation_id: &str,
    ) -> Result<VideoGeneration, ProviderError>;
}
