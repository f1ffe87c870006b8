//! Configuration schema for pipeconf
//!
//! Configuration is stored at `~/.config/pipeconf/config.toml`

use crate::cache::DigestAlgorithm;
use crate::pipeline::UNDER_CONSTRUCTION;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// HTTP server settings
    pub server: ServerConfig,

    /// Pipeline storage settings
    pub storage: StorageConfig,

    /// Fingerprint settings
    pub etag: EtagConfig,

    /// Pipeline lifecycle settings
    pub pipelines: PipelinesConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,

    /// Enable audit logging of pipeline writes
    pub audit_log: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
            audit_log: true,
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to listen on
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Largest accepted request body
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8153,
            max_body_bytes: 1024 * 1024,
        }
    }
}

impl ServerConfig {
    /// `host:port` form for binding
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Where pipelines live
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// JSON documents under the data directory
    #[default]
    File,
    /// Process memory, lost on exit
    Memory,
}

impl std::str::FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file" => Ok(Self::File),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown storage backend '{}' (file, memory)", other)),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Data directory; defaults to the platform state directory
    pub data_dir: Option<PathBuf>,

    /// Storage backend
    pub backend: StorageBackend,
}

/// Fingerprint configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EtagConfig {
    /// Digest for fingerprints and precondition tokens
    pub algorithm: DigestAlgorithm,
}

/// Pipeline lifecycle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelinesConfig {
    /// Pause newly created pipelines
    pub pause_on_create: bool,

    /// Cause recorded on the pause
    pub pause_cause: String,
}

impl Default for PipelinesConfig {
    fn default() -> Self {
        Self {
            pause_on_create: true,
            pause_cause: UNDER_CONSTRUCTION.to_string(),
        }
    }
}
