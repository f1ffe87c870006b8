//! Record of the server that owns a data directory
//!
//! `serve` writes its listening address to `<data_dir>/server.json`. Other
//! commands pointed at the same directory send their requests there, so
//! every write to the directory passes through the fingerprint cache that
//! answers reads.

use crate::error::{PipeconfError, PipeconfResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::net::TcpStream;
use tracing::{debug, warn};

/// File name of the record inside the data directory
pub const ENDPOINT_FILE: &str = "server.json";

const CONNECT_TIMEOUT: Duration = Duration::from_millis(500);

/// Where a running server accepts requests for a data directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerEndpoint {
    pub addr: SocketAddr,
    pub pid: u32,
    pub started_at: DateTime<Utc>,
}

impl ServerEndpoint {
    /// Endpoint for this process listening on `addr`
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            pid: std::process::id(),
            started_at: Utc::now(),
        }
    }

    pub fn path(data_dir: &Path) -> PathBuf {
        data_dir.join(ENDPOINT_FILE)
    }

    /// Write the record, replacing any previous one
    pub async fn publish(&self, data_dir: &Path) -> PipeconfResult<()> {
        let path = Self::path(data_dir);
        let content = serde_json::to_string_pretty(self)?;
        fs::write(&path, content)
            .await
            .map_err(|e| PipeconfError::io(format!("writing {}", path.display()), e))?;
        debug!(addr = %self.addr, "Published server endpoint to {}", path.display());
        Ok(())
    }

    /// Read the record, if any. An unreadable record counts as absent.
    pub async fn discover(data_dir: &Path) -> PipeconfResult<Option<Self>> {
        let path = Self::path(data_dir);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(PipeconfError::io(format!("reading {}", path.display()), e)),
        };

        match serde_json::from_str(&content) {
            Ok(endpoint) => Ok(Some(endpoint)),
            Err(e) => {
                warn!("Ignoring unreadable server record {}: {}", path.display(), e);
                Ok(None)
            }
        }
    }

    /// Remove the record if it still belongs to this process
    pub async fn withdraw(data_dir: &Path) -> PipeconfResult<()> {
        match Self::discover(data_dir).await? {
            Some(endpoint) if endpoint.pid == std::process::id() => {
                let path = Self::path(data_dir);
                fs::remove_file(&path)
                    .await
                    .map_err(|e| PipeconfError::io(format!("removing {}", path.display()), e))
            }
            _ => Ok(()),
        }
    }

    /// Whether something still accepts connections at the recorded address
    pub async fn is_listening(&self) -> bool {
        matches!(
            tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(self.addr)).await,
            Ok(Ok(_))
        )
    }
}
