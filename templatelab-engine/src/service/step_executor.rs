//! Step executor
//!
//! Resolves the inputs of one step from its config, the execution's input
//! data and the outputs of earlier steps, then invokes the matching
//! capability. Empty strings count as absent when resolving inputs.

use std::sync::Arc;

use serde_json::Value as JsonValue;
use templatelab_core::domain::capability::{
    DEFAULT_ANALYSIS_PROMPT, DEFAULT_VIDEO_DURATION, ImageAnalysisRequest,
    ImageGenerationRequest, VideoGenerationRequest,
};
use templatelab_core::domain::execution::{InputData, StepResults};
use templatelab_core::domain::pipeline::{PipelineError, Step, StepSpec};

use crate::provider::CapabilityProvider;
use crate::service::error::ExecutionError;

pub struct StepExecutor {
    provider: Arc<dyn CapabilityProvider>,
}

impl StepExecutor {
    pub fn new(provider: Arc<dyn CapabilityProvider>) -> Self {
        Self { provider }
    }

    /// Executes one step and returns its output as a JSON object
    ///
    /// Step types without a capability fail with `UnsupportedStepType`
    /// before any provider call.
    pub async fn execute_step(
        &self,
        step: &Step,
        input_data: &InputData,
        previous_results: &StepResults,
    ) -> Result<JsonValue, ExecutionError> {
        let output = match step.spec()? {
            StepSpec::ImageGeneration(config) => {
                let prompt = non_empty(config.prompt)
                    .or_else(|| input_str(input_data, "prompt"))
                    .ok_or_else(|| {
                        PipelineError::invalid_step(&step.id, "no prompt in config or input data")
                    })?;

                let result = self
                    .provider
                    .generate_image(ImageGenerationRequest {
                        prompt,
                        width: config.width,
                        height: config.height,
                        model: non_empty(config.model),
                    })
                    .await?;

                serde_json::to_value(result)?
            }
            StepSpec::ImageAnalysis(config) => {
                let image_url =
                    resolve_image_url(step, input_data, previous_results).ok_or_else(|| {
                        PipelineError::invalid_step(&step.id, "no image URL to analyze")
                    })?;

                let result = self
                    .provider
                    .analyze_image(ImageAnalysisRequest {
                        image_url,
                        prompt: non_empty(config.analysis_prompt)
                            .unwrap_or_else(|| DEFAULT_ANALYSIS_PROMPT.to_string()),
                        model: non_empty(config.model),
                    })
                    .await?;

                serde_json::to_value(result)?
            }
            StepSpec::VideoGeneration(config) => {
                let prompt = non_empty(config.prompt)
                    .or_else(|| input_str(input_data, "prompt"))
                    .ok_or_else(|| {
                        PipelineError::invalid_step(&step.id, "no prompt in config or input data")
                    })?;

                let result = self
                    .provider
                    .generate_video(VideoGenerationRequest {
                        prompt,
                        duration: Some(
                            config
                                .duration
                                .filter(|d| *d > 0)
                                .unwrap_or(DEFAULT_VIDEO_DURATION),
                        ),
                        input_image_url: resolve_image_url(step, input_data, previous_results),
                        model: non_empty(config.model),
                    })
                    .await?;

                serde_json::to_value(result)?
            }
            StepSpec::TextGeneration | StepSpec::ImageEdit => {
                return Err(PipelineError::UnsupportedStepType(step.step_type.clone()).into());
            }
        };

        Ok(output)
    }
}

/// Image input of a step
///
/// With a dependency, only the dependency's `imageUrl` output is used; the
/// input data is consulted only when the step has no dependency.
fn resolve_image_url(
    step: &Step,
    input_data: &InputData,
    previous_results: &StepResults,
) -> Option<String> {
    match step.depends_on_step_id.as_deref() {
        Some(dependency) => previous_results
            .get(dependency)
            .and_then(|output| output.get("imageUrl"))
            .and_then(JsonValue::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        None => input_str(input_data, "imageUrl"),
    }
}

fn input_str(input_data: &InputData, key: &str) -> Option<String> {
    input_data
        .get(key)
        .and_then(JsonValue::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}
