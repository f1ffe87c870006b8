//! Stored pipeline record

use crate::pipeline::config::PipelineConfig;
use crate::pipeline::gateway::Requester;
use crate::pipeline::pause::PauseInfo;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A pipeline together with the bookkeeping kept next to it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRecord {
    /// Pipeline group the pipeline was created in
    pub group: String,

    /// The pipeline definition as last written
    pub pipeline: PipelineConfig,

    /// Pause state, if paused
    #[serde(default)]
    pub pause: Option<PauseInfo>,

    /// Who last wrote the pipeline
    pub modified_by: String,

    /// When the pipeline was created
    pub created_at: DateTime<Utc>,

    /// When the pipeline was last written
    pub updated_at: DateTime<Utc>,
}

impl PipelineRecord {
    /// Create a new record for a pipeline
    pub fn new(group: &str, pipeline: PipelineConfig, requester: &Requester) -> Self {
        let now = Utc::now();
        Self {
            group: group.to_string(),
            pipeline,
            pause: None,
            modified_by: requester.name().to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the definition, keeping group and pause state
    pub fn replace(&mut self, pipeline: PipelineConfig, requester: &Requester) {
        self.pipeline = pipeline;
        self.modified_by = requester.name().to_string();
        self.updated_at = Utc::now();
    }
}
