//! Fingerprint store
//!
//! Maps pipeline name to its last known fingerprint. Keys are case-insensitive.
//! An entry is authoritative until it is invalidated; nothing expires on its
//! own.

use crate::cache::fingerprint::Fingerprint;
use crate::error::PipeconfResult;
use crate::pipeline::name_key;
use dashmap::DashMap;
use tracing::debug;

/// Shared name to fingerprint cache
///
/// Implementations must be safe to call from many request tasks at once.
/// Errors are never surfaced to clients; callers fall back to recomputing.
pub trait FingerprintStore: Send + Sync {
    /// Look up the fingerprint for `name`
    fn get(&self, name: &str) -> PipeconfResult<Option<Fingerprint>>;

    /// Insert or overwrite the fingerprint for `name`
    fn put(&self, name: &str, fingerprint: Fingerprint) -> PipeconfResult<()>;

    /// Store `fingerprint` unless an entry already exists, returning whichever
    /// value is cached afterwards
    fn get_or_insert(&self, name: &str, fingerprint: Fingerprint) -> PipeconfResult<Fingerprint>;

    /// Remove the entry for `name`; no-op if absent
    fn invalidate(&self, name: &str) -> PipeconfResult<()>;

    /// Number of cached entries
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-process fingerprint store backed by a sharded concurrent map
#[derive(Debug, Default)]
pub struct MemoryFingerprintStore {
    entries: DashMap<String, Fingerprint>,
}

impl MemoryFingerprintStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FingerprintStore for MemoryFingerprintStore {
    fn get(&self, name: &str) -> PipeconfResult<Option<Fingerprint>> {
        Ok(self.entries.get(&name_key(name)).map(|e| e.value().clone()))
    }

    fn put(&self, name: &str, fingerprint: Fingerprint) -> PipeconfResult<()> {
        self.entries.insert(name_key(name), fingerprint);
        Ok(())
    }

    fn get_or_insert(&self, name: &str, fingerprint: Fingerprint) -> PipeconfResult<Fingerprint> {
        // The entry API holds the shard lock, so concurrent first reads agree
        let cached = self
            .entries
            .entry(name_key(name))
            .or_insert(fingerprint)
            .value()
            .clone();
        Ok(cached)
    }

    fn invalidate(&self, name: &str) -> PipeconfResult<()> {
        if self.entries.remove(&name_key(name)).is_some() {
            debug!("Invalidated fingerprint for {}", name);
        }
        Ok(())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
