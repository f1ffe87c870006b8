//! In-memory pipeline store

use crate::error::{PipeconfError, PipeconfResult};
use crate::messages::LocalizedMessage;
use crate::pipeline::config::{name_key, PipelineConfig};
use crate::pipeline::gateway::{FailureKind, OperationResult, PipelineGateway, Requester};
use crate::pipeline::pause::{PauseInfo, PauseService};
use crate::pipeline::record::PipelineRecord;
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

/// Pipeline store that lives only as long as the process
#[derive(Debug, Default)]
pub struct MemoryPipelineStore {
    records: DashMap<String, PipelineRecord>,
}

impl MemoryPipelineStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PipelineGateway for MemoryPipelineStore {
    async fn load(&self, name: &str) -> PipeconfResult<Option<PipelineConfig>> {
        Ok(self
            .records
            .get(&name_key(name))
            .map(|r| r.pipeline.clone()))
    }

    async fn create(
        &self,
        requester: &Requester,
        pipeline: &PipelineConfig,
        group: &str,
    ) -> OperationResult {
        match self.records.entry(name_key(&pipeline.name)) {
            Entry::Occupied(_) => OperationResult::failure(
                FailureKind::Conflict,
                LocalizedMessage::pipeline_already_exists(&pipeline.name),
            ),
            Entry::Vacant(slot) => {
                slot.insert(PipelineRecord::new(group, pipeline.clone(), requester));
                debug!("Stored pipeline {} in group {}", pipeline.name, group);
                OperationResult::Success
            }
        }
    }

    async fn update(&self, requester: &Requester, pipeline: &PipelineConfig) -> OperationResult {
        match self.records.get_mut(&name_key(&pipeline.name)) {
            Some(mut record) => {
                record.replace(pipeline.clone(), requester);
                OperationResult::Success
            }
            None => OperationResult::failure(
                FailureKind::NotFound,
                LocalizedMessage::pipeline_not_found(&pipeline.name),
            ),
        }
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[async_trait]
impl PauseService for MemoryPipelineStore {
    async fn pause(&self, name: &str, cause: &str, by: &Requester) -> PipeconfResult<()> {
        let mut record = self
            .records
            .get_mut(&name_key(name))
            .ok_or_else(|| PipeconfError::PipelineNotFound(name.to_string()))?;
        record.pause = Some(PauseInfo::new(cause, by));
        Ok(())
    }

    async fn pause_info(&self, name: &str) -> PipeconfResult<Option<PauseInfo>> {
        Ok(self
            .records
            .get(&name_key(name))
            .and_then(|r| r.pause.clone()))
    }
}
