//! Capability request and result types
//!
//! Shapes exchanged with the generative/analytical backends. Results are
//! serialized with camelCase keys because later steps (and API clients)
//! read them by those names, e.g. `imageUrl`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Default clip length, in seconds, when a video step does not set one
pub const DEFAULT_VIDEO_DURATION: u32 = 5;

/// Default instruction for image analysis steps
pub const DEFAULT_ANALYSIS_PROMPT: &str = "Analyze this image";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageGenerationRequest {
    pub prompt: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageGeneration {
    pub image_url: String,
    pub generation_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageAnalysisRequest {
    pub image_url: String,
    pub prompt: String,
    pub model: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAnalysis {
    pub analysis: String,
    #[serde(default)]
    pub metadata: Map<String, JsonValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoGenerationRequest {
    pub prompt: String,
    pub duration: Option<u32>,
    pub input_image_url: Option<String>,
    pub model: Option<String>,
}

/// State of an asynchronous video job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoStatus {
    Processing,
    Completed,
    Failed,
}

/// Result of starting (or polling) a video job
///
/// A `Processing` status means the video is not ready yet; `video_url` is
/// empty until the job completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoGeneration {
    pub video_url: String,
    pub generation_id: String,
    pub status: VideoStatus,
}
