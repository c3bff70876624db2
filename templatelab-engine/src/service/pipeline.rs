//! Pipeline Service
//!
//! Save-time validation and retrieval of template pipelines.

use templatelab_core::domain::pipeline::Pipeline;
use templatelab_core::dto::pipeline::SavePipeline;
use uuid::Uuid;

use crate::service::error::ExecutionError;
use crate::store::PipelineStore;

/// Validate and store the pipeline of a template
///
/// Replaces any pipeline the template already has, keeping its ID.
pub async fn save_pipeline(
    store: &dyn PipelineStore,
    template_id: Uuid,
    req: SavePipeline,
) -> Result<Pipeline, ExecutionError> {
    if req.name.trim().is_empty() {
        return Err(ExecutionError::Validation(
            "Pipeline name cannot be empty".to_string(),
        ));
    }

    let existing = store.find_by_template(template_id).await?;
    let pipeline = req.into_pipeline(existing.map(|p| p.id), template_id);

    pipeline.validate()?;

    let saved = store.save(&pipeline).await?;

    tracing::info!(
        "Pipeline saved: {} ({} steps) for template {}",
        saved.id,
        saved.steps.len(),
        template_id
    );

    Ok(saved)
}

/// Get the pipeline of a template
pub async fn get_pipeline(
    store: &dyn PipelineStore,
    template_id: Uuid,
) -> Result<Pipeline, ExecutionError> {
    store
        .find_by_template(template_id)
        .await?
        .ok_or(ExecutionError::PipelineNotFound(template_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryPipelineStore, step};
    use serde_json::json;
    use templatelab_core::domain::pipeline::PipelineError;

    fn request(steps: Vec<templatelab_core::domain::pipeline::Step>) -> SavePipeline {
        SavePipeline {
            name: "portrait".to_string(),
            description: Some("render then describe".to_string()),
            steps,
        }
    }

    #[tokio::test]
    async fn test_save_and_get() {
        let store = MemoryPipelineStore::new();
        let template_id = Uuid::new_v4();

        let saved = save_pipeline(
            &store,
            template_id,
            request(vec![step("s1", "image_generation", json!({ "prompt": "p" }))]),
        )
        .await
        .unwrap();

        let fetched = get_pipeline(&store, template_id).await.unwrap();
        assert_eq!(fetched, saved);
    }

    #[tokio::test]
    async fn test_resave_keeps_id() {
        let store = MemoryPipelineStore::new();
        let template_id = Uuid::new_v4();

        let first = save_pipeline(
            &store,
            template_id,
            request(vec![step("s1", "image_generation", json!({}))]),
        )
        .await
        .unwrap();
        let second = save_pipeline(
            &store,
            template_id,
            request(vec![step("s1", "video_generation", json!({}))]),
        )
        .await
        .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.steps[0].step_type, "video_generation");
    }

    #[tokio::test]
    async fn test_save_rejects_invalid_pipeline() {
        let store = MemoryPipelineStore::new();
        let template_id = Uuid::new_v4();

        let err = save_pipeline(
            &store,
            template_id,
            request(vec![step("s1", "image_edit", json!({}))]),
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            ExecutionError::Pipeline(PipelineError::UnsupportedStepType(_))
        ));
        assert!(store.find_by_template(template_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_rejects_empty_name() {
        let store = MemoryPipelineStore::new();
        let mut req = request(vec![step("s1", "image_generation", json!({}))]);
        req.name = "  ".to_string();

        let err = save_pipeline(&store, Uuid::new_v4(), req).await.unwrap_err();
        assert!(matches!(err, ExecutionError::Validation(_)));
    }

    #[tokio::test]
    async fn test_get_missing_pipeline() {
        let store = MemoryPipelineStore::new();
        let template_id = Uuid::new_v4();

        let err = get_pipeline(&store, template_id).await.unwrap_err();
        assert!(matches!(err, ExecutionError::PipelineNotFound(id) if id == template_id));
    }
}
