//! Audit log of pipeline writes
//!
//! Appends JSON lines to `<data_dir>/audit.log`. Each entry carries an event
//! id, a timestamp, the acting user and the pipeline it touched.

use crate::config::{Config, ConfigManager};
use crate::pipeline::Requester;
use chrono::Utc;
use serde_json::Value;
use std::path::PathBuf;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::warn;
use uuid::Uuid;

pub const PIPELINE_CREATED: &str = "pipeline.created";
pub const PIPELINE_UPDATED: &str = "pipeline.updated";
pub const PIPELINE_PAUSED: &str = "pipeline.paused";

/// File-based audit logger that appends JSON lines
pub struct AuditLog {
    enabled: bool,
    path: PathBuf,
}

impl AuditLog {
    /// Create an audit logger from config
    pub fn new(config: &Config) -> Self {
        Self {
            enabled: config.general.audit_log,
            path: ConfigManager::audit_log_path(config),
        }
    }

    /// Audit logger writing to an explicit path
    pub fn at(path: PathBuf) -> Self {
        Self { enabled: true, path }
    }

    /// Logger that drops everything
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            path: PathBuf::new(),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Record `event` for `pipeline`
    ///
    /// IO failures are logged and dropped; auditing never fails a request.
    pub async fn log(&self, event: &str, requester: &Requester, pipeline: &str, data: Value) {
        if !self.enabled {
            return;
        }

        let entry = serde_json::json!({
            "id": Uuid::new_v4(),
            "timestamp": Utc::now().to_rfc3339(),
            "event": event,
            "user": requester.name(),
            "pipeline": pipeline,
            "data": data,
        });

        let mut line = match serde_json::to_string(&entry) {
            Ok(s) => s,
            Err(e) => {
                warn!("Failed to serialize audit event: {}", e);
                return;
            }
        };
        line.push('\n');

        if let Err(e) = self.append(&line).await {
            warn!("Failed to write audit log {}: {}", self.path.display(), e);
        }
    }

    async fn append(&self, line: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}
