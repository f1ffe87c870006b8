//! Gateway doubles for exercising interleaved requests

use crate::error::PipeconfResult;
use crate::pipeline::config::PipelineConfig;
use crate::pipeline::gateway::{OperationResult, PipelineGateway, Requester};
use crate::pipeline::memory::MemoryPipelineStore;
use async_trait::async_trait;
use std::time::Duration;

/// Memory store that stalls after loading and before updating
pub struct SlowPipelineStore {
    pub inner: MemoryPipelineStore,
    load_delay: Duration,
    update_delay: Duration,
}

impl SlowPipelineStore {
    pub fn new(load_delay: Duration, update_delay: Duration) -> Self {
        Self {
            inner: MemoryPipelineStore::new(),
            load_delay,
            update_delay,
        }
    }
}

#[async_trait]
impl PipelineGateway for SlowPipelineStore {
    async fn load(&self, name: &str) -> PipeconfResult<Option<PipelineConfig>> {
        let loaded = self.inner.load(name).await;
        tokio::time::sleep(self.load_delay).await;
        loaded
    }

    async fn create(
        &self,
        requester: &Requester,
        pipeline: &PipelineConfig,
        group: &str,
    ) -> OperationResult {
        self.inner.create(requester, pipeline, group).await
    }

    async fn update(&self, requester: &Requester, pipeline: &PipelineConfig) -> OperationResult {
        tokio::time::sleep(self.update_delay).await;
        self.inner.update(requester, pipeline).await
    }

    fn backend_name(&self) -> &'static str {
        "slow"
    }
}
