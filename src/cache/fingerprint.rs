//! Content fingerprints for change detection
//!
//! A resource is serialized to canonical JSON (object keys sorted at every
//! depth, no whitespace) and the bytes are digested. Same content = same
//! fingerprint, whatever order the fields were inserted in.
//!
//! Clients prove freshness on writes with a precondition token, which is the
//! digest of the fingerprint string rather than the fingerprint itself.

use crate::error::PipeconfResult;
use md5::Md5;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;

/// Digest used for fingerprints and precondition tokens
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    /// MD5, compatible with existing clients
    #[default]
    Md5,
    /// SHA-256
    Sha256,
}

impl DigestAlgorithm {
    /// Lowercase hex digest of `bytes`
    pub fn hex_digest(&self, bytes: &[u8]) -> String {
        match self {
            Self::Md5 => hex::encode(Md5::digest(bytes)),
            Self::Sha256 => hex::encode(Sha256::digest(bytes)),
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Md5 => "md5",
            Self::Sha256 => "sha256",
        };
        write!(f, "{}", name)
    }
}

impl std::str::FromStr for DigestAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "md5" => Ok(Self::Md5),
            "sha256" => Ok(Self::Sha256),
            other => Err(format!("unknown digest algorithm '{}' (md5, sha256)", other)),
        }
    }
}

/// Canonical serialized form of a resource at one point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSnapshot(Vec<u8>);

impl ResourceSnapshot {
    /// Serialize `resource` canonically
    pub fn of<T: Serialize>(resource: &T) -> PipeconfResult<Self> {
        let value = canonicalize(serde_json::to_value(resource)?);
        Ok(Self(serde_json::to_vec(&value)?))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Rebuild every object with its keys in sorted order
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, canonicalize(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// Opaque content fingerprint, compared byte-for-byte
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pure fingerprint and precondition-token computation
#[derive(Debug, Clone, Copy, Default)]
pub struct FingerprintComputer {
    algorithm: DigestAlgorithm,
}

impl FingerprintComputer {
    pub fn new(algorithm: DigestAlgorithm) -> Self {
        Self { algorithm }
    }

    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// Fingerprint of a snapshot
    pub fn compute(&self, snapshot: &ResourceSnapshot) -> Fingerprint {
        Fingerprint(self.algorithm.hex_digest(snapshot.as_bytes()))
    }

    /// Token a client must present to write over the version with `validator`
    pub fn precondition_token(&self, validator: &str) -> String {
        self.algorithm.hex_digest(validator.as_bytes())
    }
}
