//! Error types for pipeconf
//!
//! All modules use `PipeconfResult<T>` as their return type.

use crate::messages::{self, LocalizedMessage};
use crate::pipeline::FailureKind;
use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

const STALE_HINT: &str = "Run `pipeconf show <name>` for a fresh ETag, then retry the update";

/// Result type alias for pipeconf operations
pub type PipeconfResult<T> = Result<T, PipeconfError>;

/// All errors that can occur in pipeconf
#[derive(Error, Debug)]
pub enum PipeconfError {
    // Request rejections
    #[error(
        "Either the resource you requested was not found, or you are not authorized \
         to perform this action (pipeline '{0}')."
    )]
    PipelineNotFound(String),

    #[error("Failed to add pipeline. The pipeline '{0}' already exists.")]
    PipelineExists(String),

    #[error("Pipeline group must be specified for creating a pipeline.")]
    GroupRequired,

    #[error(
        "Renaming of pipelines is not supported by this API \
         (path '{path}', payload '{payload}')."
    )]
    RenameNotAllowed { path: String, payload: String },

    #[error(
        "Someone has modified the configuration for pipeline '{0}'. \
         Please update your copy of the config with the changes."
    )]
    StalePipelineConfig(String),

    #[error("Invalid pipeline: {0}")]
    InvalidPipeline(String),

    #[error("Malformed request body: {0}")]
    MalformedBody(String),

    #[error("Request body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    // Gateway errors
    #[error("{message}")]
    Gateway {
        kind: FailureKind,
        message: LocalizedMessage,
    },

    #[error("Fingerprint store unavailable: {0}")]
    FingerprintStore(String),

    #[error("Server rejected the request ({status}): {message}")]
    Rejected {
        status: u16,
        message_key: String,
        message: String,
    },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Server errors
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Data directory {path} is already served by a server at {addr}")]
    DataDirInUse { path: PathBuf, addr: SocketAddr },

    #[error("Request to server at {addr} failed: {reason}")]
    Server { addr: SocketAddr, reason: String },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl PipeconfError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a gateway failure from a kind and message
    pub fn gateway(kind: FailureKind, message: LocalizedMessage) -> Self {
        Self::Gateway { kind, message }
    }

    /// Localized message key reported to clients alongside the rendered text
    pub fn message_key(&self) -> &str {
        match self {
            Self::PipelineNotFound(_) => messages::RESOURCE_NOT_FOUND,
            Self::PipelineExists(_) => messages::CANNOT_CREATE_PIPELINE_ALREADY_EXISTS,
            Self::GroupRequired => messages::PIPELINE_GROUP_MANDATORY_FOR_PIPELINE_CREATE,
            Self::RenameNotAllowed { .. } => messages::PIPELINE_RENAMING_NOT_ALLOWED,
            Self::StalePipelineConfig(_) => messages::STALE_PIPELINE_CONFIG,
            Self::InvalidPipeline(_) => messages::INVALID_PIPELINE,
            Self::MalformedBody(_) => messages::MALFORMED_REQUEST_BODY,
            Self::BodyTooLarge { .. } => messages::REQUEST_BODY_TOO_LARGE,
            Self::Gateway { message, .. } => message.key(),
            Self::Rejected { message_key, .. } => message_key,
            _ => messages::INTERNAL_SERVER_ERROR,
        }
    }

    /// Check if the client should re-fetch and retry.
    ///
    /// Nothing in this crate retries on the client's behalf.
    pub fn is_retryable(&self) -> bool {
        self.message_key() == messages::STALE_PIPELINE_CONFIG
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::StalePipelineConfig(_) => Some(STALE_HINT),
            Self::Rejected { message_key, .. }
                if message_key == messages::STALE_PIPELINE_CONFIG =>
            {
                Some(STALE_HINT)
            }
            Self::GroupRequired => Some("Pass --group <name>"),
            Self::RenameNotAllowed { .. } => {
                Some("The payload name must match the pipeline being updated")
            }
            Self::Bind { .. } => Some("Pick another port with --port or set server.port"),
            Self::DataDirInUse { .. } => {
                Some("Stop the other server, or point storage.data_dir somewhere else")
            }
            Self::Server { .. } => Some("Check that `pipeconf serve` is still running"),
            _ => None,
        }
    }
}
