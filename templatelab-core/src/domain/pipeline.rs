//! Pipeline domain types
//!
//! A pipeline is stored in its flat shape (`step_type` string plus an untyped
//! `config` object) so that rows written by other tools survive a round trip.
//! [`Step::spec`] turns a stored step into a [`StepSpec`], the typed view the
//! executor dispatches on.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::plan::ExecutionPlan;

/// Pipeline definition owned by a template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    pub id: Uuid,
    pub template_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    /// Stored order is significant and stable across reads.
    pub steps: Vec<Step>,
}

/// A single unit of work within a pipeline, in its stored shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub id: String,
    #[serde(rename = "step_order", alias = "order", default)]
    pub order: i32,
    pub step_type: String,
    #[serde(default)]
    pub config: Map<String, JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends_on_step_id: Option<String>,
}

/// Step types known to the data model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    ImageGeneration,
    ImageAnalysis,
    VideoGeneration,
    TextGeneration,
    ImageEdit,
}

impl StepType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepType::ImageGeneration => "image_generation",
            StepType::ImageAnalysis => "image_analysis",
            StepType::VideoGeneration => "video_generation",
            StepType::TextGeneration => "text_generation",
            StepType::ImageEdit => "image_edit",
        }
    }
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepType {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image_generation" => Ok(StepType::ImageGeneration),
            "image_analysis" => Ok(StepType::ImageAnalysis),
            "video_generation" => Ok(StepType::VideoGeneration),
            "text_generation" => Ok(StepType::TextGeneration),
            "image_edit" => Ok(StepType::ImageEdit),
            other => Err(PipelineError::UnsupportedStepType(other.to_string())),
        }
    }
}

/// Configuration of an `image_generation` step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageGenerationConfig {
    pub prompt: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub model: Option<String>,
}

/// Configuration of an `image_analysis` step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAnalysisConfig {
    pub analysis_prompt: Option<String>,
    pub model: Option<String>,
}

/// Configuration of a `video_generation` step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoGenerationConfig {
    pub prompt: Option<String>,
    /// Clip length in seconds
    pub duration: Option<u32>,
    pub model: Option<String>,
}

/// Typed view of a step: one variant per step type, carrying only its fields
#[derive(Debug, Clone, PartialEq)]
pub enum StepSpec {
    ImageGeneration(ImageGenerationConfig),
    ImageAnalysis(ImageAnalysisConfig),
    VideoGeneration(VideoGenerationConfig),
    /// Modeled, but no capability executes it yet
    TextGeneration,
    /// Modeled, but no capability executes it yet
    ImageEdit,
}

impl StepSpec {
    /// Whether a capability exists that can run this step
    pub fn is_executable(&self) -> bool {
        !matches!(self, StepSpec::TextGeneration | StepSpec::ImageEdit)
    }
}

/// Errors raised while interpreting a pipeline definition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("Invalid step {step_id}: {reason}")]
    InvalidStep { step_id: String, reason: String },

    #[error("Unknown step type: {0}")]
    UnsupportedStepType(String),

    #[error("Step {step_id} depends on unknown step {dependency}")]
    UnknownDependency { step_id: String, dependency: String },

    #[error("Cyclic dependency between steps: {}", .0.join(", "))]
    CyclicDependency(Vec<String>),

    #[error("Duplicate step id: {0}")]
    DuplicateStepId(String),

    #[error("Pipeline has no steps")]
    EmptyPipeline,
}

impl PipelineError {
    pub fn invalid_step(step_id: impl Into<String>, reason: impl Into<String>) -> Self {
        PipelineError::InvalidStep {
            step_id: step_id.into(),
            reason: reason.into(),
        }
    }
}

impl Step {
    /// Interprets the stored config according to the step type
    pub fn spec(&self) -> Result<StepSpec, PipelineError> {
        let spec = match self.step_type.parse::<StepType>()? {
            StepType::ImageGeneration => StepSpec::ImageGeneration(self.typed_config()?),
            StepType::ImageAnalysis => StepSpec::ImageAnalysis(self.typed_config()?),
            StepType::VideoGeneration => StepSpec::VideoGeneration(self.typed_config()?),
            StepType::TextGeneration => StepSpec::TextGeneration,
            StepType::ImageEdit => StepSpec::ImageEdit,
        };

        Ok(spec)
    }

    fn typed_config<T: serde::de::DeserializeOwned>(&self) -> Result<T, PipelineError> {
        serde_json::from_value(JsonValue::Object(self.config.clone()))
            .map_err(|e| PipelineError::invalid_step(&self.id, format!("malformed config: {e}")))
    }
}

impl Pipeline {
    /// Save-time validation
    ///
    /// Rejects anything that would otherwise only surface when the pipeline
    /// runs: malformed configs, step types no capability can execute,
    /// duplicate ids, dangling or cyclic dependencies.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.steps.is_empty() {
            return Err(PipelineError::EmptyPipeline);
        }

        let mut seen = HashSet::new();
        for step in &self.steps {
            if step.id.trim().is_empty() {
                return Err(PipelineError::invalid_step(&step.id, "step id cannot be empty"));
            }
            if !seen.insert(step.id.as_str()) {
                return Err(PipelineError::DuplicateStepId(step.id.clone()));
            }

            let spec = step.spec()?;
            if !spec.is_executable() {
                return Err(PipelineError::UnsupportedStepType(step.step_type.clone()));
            }
        }

        ExecutionPlan::build(&self.steps)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn step(id: &str, step_type: &str, config: JsonValue) -> Step {
        Step {
            id: id.to_string(),
            order: 0,
            step_type: step_type.to_string(),
            config: config.as_object().cloned().unwrap_or_default(),
            depends_on_step_id: None,
        }
    }

    fn pipeline(steps: Vec<Step>) -> Pipeline {
        Pipeline {
            id: Uuid::new_v4(),
            template_id: Uuid::new_v4(),
            name: "test".to_string(),
            description: None,
            steps,
        }
    }

    #[test]
    fn test_spec_image_generation() {
        let s = step(
            "s1",
            "image_generation",
            json!({ "prompt": "a cat", "width": 512, "height": 256, "extra": true }),
        );

        let spec = s.spec().unwrap();
        assert_eq!(
            spec,
            StepSpec::ImageGeneration(ImageGenerationConfig {
                prompt: Some("a cat".to_string()),
                width: Some(512),
                height: Some(256),
                model: None,
            })
        );
    }

    #[test]
    fn test_spec_reads_camel_case_keys() {
        let s = step("s1", "image_analysis", json!({ "analysisPrompt": "count the cats" }));

        match s.spec().unwrap() {
            StepSpec::ImageAnalysis(config) => {
                assert_eq!(config.analysis_prompt.as_deref(), Some("count the cats"));
            }
            other => panic!("unexpected spec: {other:?}"),
        }
    }

    #[test]
    fn test_spec_unknown_type() {
        let s = step("s1", "bogus", json!({}));
        assert_eq!(
            s.spec(),
            Err(PipelineError::UnsupportedStepType("bogus".to_string()))
        );
    }

    #[test]
    fn test_spec_malformed_config() {
        let s = step("s1", "image_generation", json!({ "width": "wide" }));
        assert!(matches!(s.spec(), Err(PipelineError::InvalidStep { .. })));
    }

    #[test]
    fn test_step_deserializes_stored_shape() {
        let raw = json!({
            "id": "step2",
            "step_order": 2,
            "step_type": "image_analysis",
            "config": {},
            "depends_on_step_id": "step1"
        });

        let s: Step = serde_json::from_value(raw).unwrap();
        assert_eq!(s.order, 2);
        assert_eq!(s.depends_on_step_id.as_deref(), Some("step1"));
    }

    #[test]
    fn test_validate_valid_pipeline() {
        let mut analysis = step("s2", "image_analysis", json!({}));
        analysis.depends_on_step_id = Some("s1".to_string());
        let p = pipeline(vec![
            step("s1", "image_generation", json!({ "prompt": "X" })),
            analysis,
        ]);

        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_pipeline() {
        assert_eq!(pipeline(vec![]).validate(), Err(PipelineError::EmptyPipeline));
    }

    #[test]
    fn test_validate_duplicate_ids() {
        let p = pipeline(vec![
            step("s1", "image_generation", json!({})),
            step("s1", "video_generation", json!({})),
        ]);

        assert_eq!(
            p.validate(),
            Err(PipelineError::DuplicateStepId("s1".to_string()))
        );
    }

    #[test]
    fn test_validate_rejects_non_executable_types() {
        let p = pipeline(vec![step("s1", "text_generation", json!({}))]);
        assert_eq!(
            p.validate(),
            Err(PipelineError::UnsupportedStepType("text_generation".to_string()))
        );
    }

    #[test]
    fn test_validate_unknown_dependency() {
        let mut analysis = step("s2", "image_analysis", json!({}));
        analysis.depends_on_step_id = Some("missing".to_string());
        let p = pipeline(vec![analysis]);

        assert!(matches!(
            p.validate(),
            Err(PipelineError::UnknownDependency { .. })
        ));
    }
}
