//! File-backed pipeline store
//!
//! One JSON document per pipeline under `<data_dir>/pipelines/`, named after
//! the lowercased pipeline name so lookups are case-insensitive.

use crate::error::{PipeconfError, PipeconfResult};
use crate::messages::LocalizedMessage;
use crate::pipeline::config::{name_key, validate_name, PipelineConfig};
use crate::pipeline::gateway::{FailureKind, OperationResult, PipelineGateway, Requester};
use crate::pipeline::pause::{PauseInfo, PauseService};
use crate::pipeline::record::PipelineRecord;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Pipeline store persisted as JSON files
pub struct FilePipelineStore {
    dir: PathBuf,
    /// Serializes read-modify-write cycles
    write_lock: Mutex<()>,
}

impl FilePipelineStore {
    /// Open a store rooted at `data_dir`, creating it if needed
    pub async fn open(data_dir: &Path) -> PipeconfResult<Self> {
        let dir = data_dir.join("pipelines");
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| PipeconfError::io(format!("creating {}", dir.display()), e))?;

        debug!("Opened pipeline store at {}", dir.display());
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    /// Directory holding the pipeline documents
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path for a pipeline, or `None` if the name can never be stored
    fn record_path(&self, name: &str) -> Option<PathBuf> {
        validate_name(name).ok()?;
        Some(self.dir.join(format!("{}.json", name_key(name))))
    }

    /// Read the record for a pipeline
    pub async fn read_record(&self, name: &str) -> PipeconfResult<Option<PipelineRecord>> {
        let Some(path) = self.record_path(name) else {
            return Ok(None);
        };

        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)
            .await
            .map_err(|e| {
                PipeconfError::io(format!("reading pipeline file {}", path.display()), e)
            })?;

        let record: PipelineRecord = serde_json::from_str(&content)?;
        Ok(Some(record))
    }

    async fn write_record(&self, record: &PipelineRecord) -> PipeconfResult<()> {
        let path = self.record_path(&record.pipeline.name).ok_or_else(|| {
            PipeconfError::InvalidPipeline(format!(
                "pipeline name '{}' cannot be stored",
                record.pipeline.name
            ))
        })?;

        let content = serde_json::to_string_pretty(record)?;

        // Write to a sibling file first so readers never see a torn document
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content)
            .await
            .map_err(|e| PipeconfError::io(format!("writing pipeline file {}", tmp.display()), e))?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|e| {
                PipeconfError::io(format!("replacing pipeline file {}", path.display()), e)
            })?;

        Ok(())
    }

    async fn try_create(
        &self,
        requester: &Requester,
        pipeline: &PipelineConfig,
        group: &str,
    ) -> PipeconfResult<OperationResult> {
        let _guard = self.write_lock.lock().await;

        if self.read_record(&pipeline.name).await?.is_some() {
            return Ok(OperationResult::failure(
                FailureKind::Conflict,
                LocalizedMessage::pipeline_already_exists(&pipeline.name),
            ));
        }

        let record = PipelineRecord::new(group, pipeline.clone(), requester);
        self.write_record(&record).await?;
        info!("Created pipeline {} in group {}", pipeline.name, group);
        Ok(OperationResult::Success)
    }

    async fn try_update(
        &self,
        requester: &Requester,
        pipeline: &PipelineConfig,
    ) -> PipeconfResult<OperationResult> {
        let _guard = self.write_lock.lock().await;

        let Some(mut record) = self.read_record(&pipeline.name).await? else {
            return Ok(OperationResult::failure(
                FailureKind::NotFound,
                LocalizedMessage::pipeline_not_found(&pipeline.name),
            ));
        };

        record.replace(pipeline.clone(), requester);
        self.write_record(&record).await?;
        info!("Updated pipeline {}", pipeline.name);
        Ok(OperationResult::Success)
    }
}

/// Turn an unexpected storage error into a failed operation
fn storage_failure(name: &str, err: PipeconfError) -> OperationResult {
    let kind = match &err {
        PipeconfError::InvalidPipeline(_) => FailureKind::Invalid,
        _ => FailureKind::Internal,
    };
    OperationResult::failure(kind, LocalizedMessage::save_failed(name, err))
}

#[async_trait]
impl PipelineGateway for FilePipelineStore {
    async fn load(&self, name: &str) -> PipeconfResult<Option<PipelineConfig>> {
        Ok(self.read_record(name).await?.map(|r| r.pipeline))
    }

    async fn create(
        &self,
        requester: &Requester,
        pipeline: &PipelineConfig,
        group: &str,
    ) -> OperationResult {
        self.try_create(requester, pipeline, group)
            .await
            .unwrap_or_else(|e| storage_failure(&pipeline.name, e))
    }

    async fn update(&self, requester: &Requester, pipeline: &PipelineConfig) -> OperationResult {
        self.try_update(requester, pipeline)
            .await
            .unwrap_or_else(|e| storage_failure(&pipeline.name, e))
    }

    fn backend_name(&self) -> &'static str {
        "file"
    }
}

#[async_trait]
impl PauseService for FilePipelineStore {
    async fn pause(&self, name: &str, cause: &str, by: &Requester) -> PipeconfResult<()> {
        let _guard = self.write_lock.lock().await;

        let mut record = self
            .read_record(name)
            .await?
            .ok_or_else(|| PipeconfError::PipelineNotFound(name.to_string()))?;

        record.pause = Some(PauseInfo::new(cause, by));
        self.write_record(&record).await?;
        info!("Paused pipeline {}: {}", name, cause);
        Ok(())
    }

    async fn pause_info(&self, name: &str) -> PipeconfResult<Option<PauseInfo>> {
        Ok(self.read_record(name).await?.and_then(|r| r.pause))
    }
}
