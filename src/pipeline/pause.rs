//! Pipeline pause state
//!
//! A freshly created pipeline is paused until someone unpauses it. The pause
//! is applied by the request boundary after the gateway has confirmed the
//! create, never before.

use crate::error::PipeconfResult;
use crate::pipeline::gateway::Requester;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default cause recorded when pausing a newly created pipeline
pub const UNDER_CONSTRUCTION: &str = "Under construction";

/// Recorded pause of a pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PauseInfo {
    /// Why the pipeline was paused
    pub cause: String,

    /// Who paused it
    pub paused_by: String,

    /// When it was paused
    pub paused_at: DateTime<Utc>,
}

impl PauseInfo {
    pub fn new(cause: impl Into<String>, by: &Requester) -> Self {
        Self {
            cause: cause.into(),
            paused_by: by.name().to_string(),
            paused_at: Utc::now(),
        }
    }
}

/// Operational pause state of pipelines
#[async_trait]
pub trait PauseService: Send + Sync {
    /// Pause the named pipeline, overwriting any earlier pause
    async fn pause(&self, name: &str, cause: &str, by: &Requester) -> PipeconfResult<()>;

    /// Current pause, if the pipeline is paused
    async fn pause_info(&self, name: &str) -> PipeconfResult<Option<PauseInfo>>;
}
