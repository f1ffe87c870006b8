//! Shared application state for API handlers.

use crate::audit::AuditLog;
use crate::cache::{FingerprintComputer, FingerprintStore, MemoryFingerprintStore};
use crate::config::{Config, ConfigManager, StorageBackend};
use crate::error::PipeconfResult;
use crate::guard::ConcurrencyGuard;
use crate::pipeline::{
    FilePipelineStore, MemoryPipelineStore, PauseService, PipelineGateway, UNDER_CONSTRUCTION,
};
use std::sync::Arc;
use tracing::info;

/// Request handling knobs taken from configuration.
#[derive(Debug, Clone)]
pub struct ApiSettings {
    /// Largest accepted request body.
    pub max_body_bytes: usize,
    /// Pause pipelines right after they are created.
    pub pause_on_create: bool,
    /// Cause recorded on that pause.
    pub pause_cause: String,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            max_body_bytes: 1024 * 1024,
            pause_on_create: true,
            pause_cause: UNDER_CONSTRUCTION.to_string(),
        }
    }
}

impl From<&Config> for ApiSettings {
    fn from(config: &Config) -> Self {
        Self {
            max_body_bytes: config.server.max_body_bytes,
            pause_on_create: config.pipelines.pause_on_create,
            pause_cause: config.pipelines.pause_cause.clone(),
        }
    }
}

/// Shared application state passed to all handlers.
pub struct AppState {
    /// Conditional read and write checks.
    pub guard: ConcurrencyGuard,
    /// Post-create pause hook.
    pub pause: Arc<dyn PauseService>,
    /// Audit trail of writes.
    pub audit: AuditLog,
    /// Request handling settings.
    pub settings: ApiSettings,
}

impl AppState {
    /// Create application state over explicit collaborators.
    pub fn new(
        guard: ConcurrencyGuard,
        pause: Arc<dyn PauseService>,
        audit: AuditLog,
        settings: ApiSettings,
    ) -> Self {
        Self {
            guard,
            pause,
            audit,
            settings,
        }
    }

    /// In-memory state with default settings and no audit log.
    pub fn in_memory() -> Self {
        let store = Arc::new(MemoryPipelineStore::new());
        Self::over(store.clone(), store, &Config::default(), AuditLog::disabled())
    }

    /// Build state for `config`, opening the configured storage backend.
    pub async fn open(config: &Config) -> PipeconfResult<Self> {
        let audit = AuditLog::new(config);
        let state = match config.storage.backend {
            StorageBackend::File => {
                let data_dir = ConfigManager::data_dir(config);
                let store = Arc::new(FilePipelineStore::open(&data_dir).await?);
                Self::over(store.clone(), store, config, audit)
            }
            StorageBackend::Memory => {
                let store = Arc::new(MemoryPipelineStore::new());
                Self::over(store.clone(), store, config, audit)
            }
        };

        info!(
            backend = state.guard.gateway().backend_name(),
            algorithm = %config.etag.algorithm,
            "Pipeline state ready"
        );
        Ok(state)
    }

    fn over(
        gateway: Arc<dyn PipelineGateway>,
        pause: Arc<dyn PauseService>,
        config: &Config,
        audit: AuditLog,
    ) -> Self {
        let fingerprints: Arc<dyn FingerprintStore> = Arc::new(MemoryFingerprintStore::new());
        let guard = ConcurrencyGuard::new(
            fingerprints,
            FingerprintComputer::new(config.etag.algorithm),
            gateway,
        );
        Self::new(guard, pause, audit, ApiSettings::from(config))
    }

    pub fn gateway(&self) -> &Arc<dyn PipelineGateway> {
        self.guard.gateway()
    }
}
