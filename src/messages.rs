//! Localized message keys
//!
//! Every rejection carries a stable key next to its rendered English text so
//! clients can localize on their side.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const RESOURCE_NOT_FOUND: &str = "RESOURCE_NOT_FOUND";
pub const CANNOT_CREATE_PIPELINE_ALREADY_EXISTS: &str = "CANNOT_CREATE_PIPELINE_ALREADY_EXISTS";
pub const PIPELINE_GROUP_MANDATORY_FOR_PIPELINE_CREATE: &str =
    "PIPELINE_GROUP_MANDATORY_FOR_PIPELINE_CREATE";
pub const PIPELINE_RENAMING_NOT_ALLOWED: &str = "PIPELINE_RENAMING_NOT_ALLOWED";
pub const STALE_PIPELINE_CONFIG: &str = "STALE_PIPELINE_CONFIG";
pub const INVALID_PIPELINE: &str = "INVALID_PIPELINE";
pub const MALFORMED_REQUEST_BODY: &str = "MALFORMED_REQUEST_BODY";
pub const REQUEST_BODY_TOO_LARGE: &str = "REQUEST_BODY_TOO_LARGE";
pub const INTERNAL_SERVER_ERROR: &str = "INTERNAL_SERVER_ERROR";

// Gateway-side failures
pub const PIPELINE_NOT_FOUND: &str = "PIPELINE_NOT_FOUND";
pub const PIPELINE_ALREADY_EXISTS: &str = "PIPELINE_ALREADY_EXISTS";
pub const CONFIG_SAVE_FAILED: &str = "CONFIG_SAVE_FAILED";

/// A message key paired with its rendered text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedMessage {
    key: String,
    text: String,
}

impl LocalizedMessage {
    pub fn new(key: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            text: text.into(),
        }
    }

    pub fn pipeline_not_found(name: &str) -> Self {
        Self::new(
            PIPELINE_NOT_FOUND,
            format!("Pipeline '{}' does not exist.", name),
        )
    }

    pub fn pipeline_already_exists(name: &str) -> Self {
        Self::new(
            PIPELINE_ALREADY_EXISTS,
            format!("Failed to add pipeline. The pipeline '{}' already exists.", name),
        )
    }

    pub fn save_failed(name: &str, reason: impl fmt::Display) -> Self {
        Self::new(
            CONFIG_SAVE_FAILED,
            format!("Failed to save pipeline '{}': {}", name, reason),
        )
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for LocalizedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
