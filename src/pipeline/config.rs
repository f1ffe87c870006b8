//! Pipeline configuration resource

use crate::error::{PipeconfError, PipeconfResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Longest pipeline name accepted
pub const MAX_NAME_LENGTH: usize = 255;

/// A named pipeline definition.
///
/// Only `name` is interpreted here; every other attribute is carried through
/// opaquely and stored as submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Pipeline name, compared case-insensitively
    pub name: String,

    /// Remaining attributes (materials, stages, label template, ...)
    #[serde(flatten)]
    pub attributes: BTreeMap<String, Value>,
}

impl PipelineConfig {
    /// Create a pipeline with no attributes
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Set an attribute, replacing any previous value
    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// Check whether this pipeline is called `name`, ignoring case
    pub fn is_named(&self, name: &str) -> bool {
        names_match(&self.name, name)
    }

    /// Validate the pipeline name
    pub fn validate(&self) -> PipeconfResult<()> {
        validate_name(&self.name)
    }
}

/// Two pipeline names are equal iff they are equal after lowercasing
pub fn names_match(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// Normalized form of a pipeline name, used as a storage and cache key
pub fn name_key(name: &str) -> String {
    name.to_lowercase()
}

/// Check a pipeline name against the naming rules.
///
/// Names are 1..=255 chars of `[A-Za-z0-9_\-.]` and may not start with `.`.
pub fn validate_name(name: &str) -> PipeconfResult<()> {
    if name.trim().is_empty() {
        return Err(PipeconfError::InvalidPipeline(
            "pipeline name must not be blank".to_string(),
        ));
    }

    if name.len() > MAX_NAME_LENGTH {
        return Err(PipeconfError::InvalidPipeline(format!(
            "pipeline name is longer than {} characters",
            MAX_NAME_LENGTH
        )));
    }

    if name.starts_with('.') {
        return Err(PipeconfError::InvalidPipeline(format!(
            "pipeline name '{}' may not start with '.'",
            name
        )));
    }

    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')))
    {
        return Err(PipeconfError::InvalidPipeline(format!(
            "pipeline name '{}' contains invalid character {:?}",
            name, c
        )));
    }

    Ok(())
}
