//! Pipeline DTOs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::pipeline::{Pipeline, Step};

/// Request to save the pipeline of a template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavePipeline {
    pub name: String,
    pub description: Option<String>,
    pub steps: Vec<Step>,
}

impl SavePipeline {
    /// Builds the pipeline, reusing `id` when the template already has one
    pub fn into_pipeline(self, id: Option<Uuid>, template_id: Uuid) -> Pipeline {
        Pipeline {
            id: id.unwrap_or_else(Uuid::new_v4),
            template_id,
            name: self.name,
            description: self.description,
            steps: self.steps,
        }
    }
}
