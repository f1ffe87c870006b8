//! Pipeline storage abstraction
//!
//! The concurrency guard and the HTTP handlers only ever reach pipeline
//! definitions through [`PipelineGateway`]; how they are persisted is up to
//! the implementation (files on disk, in-memory map).

use crate::error::{PipeconfError, PipeconfResult};
use crate::messages::LocalizedMessage;
use crate::pipeline::config::PipelineConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Who is asking for a change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requester(String);

impl Requester {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn anonymous() -> Self {
        Self("anonymous".to_string())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Requester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Machine-readable reason a gateway operation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    NotFound,
    Conflict,
    Invalid,
    Unauthorized,
    Internal,
}

/// Outcome of a create or update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationResult {
    Success,
    Failure {
        kind: FailureKind,
        message: LocalizedMessage,
    },
}

impl OperationResult {
    pub fn failure(kind: FailureKind, message: LocalizedMessage) -> Self {
        Self::Failure { kind, message }
    }

    pub fn is_successful(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Convert into a `Result`, turning failures into `PipeconfError::Gateway`
    pub fn into_result(self) -> PipeconfResult<()> {
        match self {
            Self::Success => Ok(()),
            Self::Failure { kind, message } => Err(PipeconfError::gateway(kind, message)),
        }
    }
}

/// Source of truth for pipeline definitions
#[async_trait]
pub trait PipelineGateway: Send + Sync {
    /// Load a pipeline by name, ignoring case
    async fn load(&self, name: &str) -> PipeconfResult<Option<PipelineConfig>>;

    /// Persist a new pipeline into `group`
    async fn create(
        &self,
        requester: &Requester,
        pipeline: &PipelineConfig,
        group: &str,
    ) -> OperationResult;

    /// Replace an existing pipeline with the same name
    async fn update(&self, requester: &Requester, pipeline: &PipelineConfig) -> OperationResult;

    /// Human-readable backend name for logs
    fn backend_name(&self) -> &'static str;
}
