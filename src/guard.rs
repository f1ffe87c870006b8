//! Optimistic concurrency guard
//!
//! Stateless between requests except through the [`FingerprintStore`].
//! Readers can short-circuit unchanged reads by presenting the fingerprint
//! they last saw; writers must present the digest of that fingerprint, and
//! are rejected as stale if it no longer matches.
//!
//! Writes and cache misses for one name run under that name's [`NameLock`],
//! so a fingerprint is only ever cached for content no write can be racing.
//! Cache hits take no lock: the entry is read again after loading, and a
//! write in between sends the reader down the locked path.

use crate::cache::{Fingerprint, FingerprintComputer, FingerprintStore, ResourceSnapshot};
use crate::error::{PipeconfError, PipeconfResult};
use crate::pipeline::{name_key, PipelineConfig, PipelineGateway};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};

/// Result of a conditional read
#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutcome {
    /// The presented validator is current; no body needed
    NotModified { fingerprint: Fingerprint },
    /// Full pipeline with its current fingerprint
    Fresh {
        pipeline: PipelineConfig,
        fingerprint: Fingerprint,
    },
}

impl ReadOutcome {
    fn new(pipeline: PipelineConfig, fingerprint: Fingerprint, presented: Option<&str>) -> Self {
        if presented.is_some_and(|validator| validator == fingerprint.as_str()) {
            Self::NotModified { fingerprint }
        } else {
            Self::Fresh {
                pipeline,
                fingerprint,
            }
        }
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        match self {
            Self::NotModified { fingerprint } | Self::Fresh { fingerprint, .. } => fingerprint,
        }
    }
}

/// Exclusive hold on one pipeline name, released on drop
#[must_use = "the name is unlocked as soon as this is dropped"]
pub struct NameLock {
    _held: OwnedMutexGuard<()>,
}

/// Conditional read and write checks over a pipeline gateway
pub struct ConcurrencyGuard {
    store: Arc<dyn FingerprintStore>,
    computer: FingerprintComputer,
    gateway: Arc<dyn PipelineGateway>,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl ConcurrencyGuard {
    pub fn new(
        store: Arc<dyn FingerprintStore>,
        computer: FingerprintComputer,
        gateway: Arc<dyn PipelineGateway>,
    ) -> Self {
        Self {
            store,
            computer,
            gateway,
            locks: DashMap::new(),
        }
    }

    pub fn computer(&self) -> &FingerprintComputer {
        &self.computer
    }

    pub fn gateway(&self) -> &Arc<dyn PipelineGateway> {
        &self.gateway
    }

    /// Wait for exclusive access to `name` (case-insensitive).
    ///
    /// Hold it from [`validate_before_write`](Self::validate_before_write)
    /// until the written pipeline has been read back.
    pub async fn lock(&self, name: &str) -> NameLock {
        let mutex = Arc::clone(&self.locks.entry(name_key(name)).or_default());
        NameLock {
            _held: mutex.lock_owned().await,
        }
    }

    /// Load a pipeline and compare `presented` against its fingerprint.
    ///
    /// The cached fingerprint is used when present; otherwise it is computed
    /// from the loaded pipeline and cached.
    pub async fn read_with_caching(
        &self,
        name: &str,
        presented: Option<&str>,
    ) -> PipeconfResult<ReadOutcome> {
        if let Some(fingerprint) = self.cached(name) {
            let pipeline = self.load(name).await?;
            if self.cached(name).as_ref() == Some(&fingerprint) {
                debug!("Fingerprint cache hit for {}", name);
                return Ok(ReadOutcome::new(pipeline, fingerprint, presented));
            }
            debug!("Fingerprint for {} changed while loading", name);
        }

        let _lock = self.lock(name).await;
        self.read_locked(name, presented).await
    }

    /// [`read_with_caching`](Self::read_with_caching) for a caller that
    /// already holds [`lock`](Self::lock) for `name`.
    pub async fn read_locked(
        &self,
        name: &str,
        presented: Option<&str>,
    ) -> PipeconfResult<ReadOutcome> {
        let pipeline = self.load(name).await?;

        let fingerprint = match self.cached(name) {
            Some(fingerprint) => fingerprint,
            None => {
                debug!("Fingerprint cache miss for {}", name);
                let computed = self.computer.compute(&ResourceSnapshot::of(&pipeline)?);
                self.remember(name, computed)
            }
        };

        Ok(ReadOutcome::new(pipeline, fingerprint, presented))
    }

    /// Check that `presented` is the precondition token for the current
    /// version of `name`. The caller must hold [`lock`](Self::lock) for it.
    ///
    /// A missing token is treated like a mismatched one.
    pub async fn validate_before_write(
        &self,
        name: &str,
        presented: Option<&str>,
    ) -> PipeconfResult<()> {
        let fingerprint = match self.cached(name) {
            Some(fingerprint) => fingerprint,
            None => self.read_locked(name, None).await?.fingerprint().clone(),
        };

        let expected = self.computer.precondition_token(fingerprint.as_str());
        match presented {
            Some(token) if token == expected => Ok(()),
            _ => {
                debug!("Rejecting stale write to {}", name);
                Err(PipeconfError::StalePipelineConfig(name.to_string()))
            }
        }
    }

    /// Drop the cached fingerprint for `name`
    pub fn invalidate(&self, name: &str) {
        if let Err(e) = self.store.invalidate(name) {
            warn!("Failed to invalidate fingerprint for {}: {}", name, e);
        }
    }

    /// Drop the cached fingerprint after a successful write.
    ///
    /// A renamed pipeline is not seeded under its new name; the next read
    /// computes it.
    pub fn on_successful_write(&self, name: &str, renamed_to: Option<&str>) {
        self.invalidate(name);
        if let Some(new_name) = renamed_to {
            debug!("Pipeline {} renamed to {}; fingerprint computed on next read", name, new_name);
        }
    }

    async fn load(&self, name: &str) -> PipeconfResult<PipelineConfig> {
        self.gateway
            .load(name)
            .await?
            .ok_or_else(|| PipeconfError::PipelineNotFound(name.to_string()))
    }

    fn cached(&self, name: &str) -> Option<Fingerprint> {
        match self.store.get(name) {
            Ok(cached) => cached,
            Err(e) => {
                warn!("Fingerprint store read failed for {}, recomputing: {}", name, e);
                None
            }
        }
    }

    fn remember(&self, name: &str, computed: Fingerprint) -> Fingerprint {
        match self.store.get_or_insert(name, computed.clone()) {
            Ok(cached) => cached,
            Err(e) => {
                warn!("Fingerprint store write failed for {}: {}", name, e);
                computed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryFingerprintStore;
    use crate::pipeline::testing::SlowPipelineStore;
    use crate::pipeline::{MemoryPipelineStore, Requester};
    use serde_json::json;
    use std::time::Duration;

    struct BrokenStore;

    impl FingerprintStore for BrokenStore {
        fn get(&self, _name: &str) -> PipeconfResult<Option<Fingerprint>> {
            Err(PipeconfError::FingerprintStore("offline".into()))
        }
        fn put(&self, _name: &str, _fingerprint: Fingerprint) -> PipeconfResult<()> {
            Err(PipeconfError::FingerprintStore("offline".into()))
        }
        fn get_or_insert(
            &self,
            _name: &str,
            _fingerprint: Fingerprint,
        ) -> PipeconfResult<Fingerprint> {
            Err(PipeconfError::FingerprintStore("offline".into()))
        }
        fn invalidate(&self, _name: &str) -> PipeconfResult<()> {
            Err(PipeconfError::FingerprintStore("offline".into()))
        }
        fn len(&self) -> usize {
            0
        }
    }

    async fn setup() -> (ConcurrencyGuard, Arc<MemoryPipelineStore>, Arc<MemoryFingerprintStore>) {
        let pipelines = Arc::new(MemoryPipelineStore::new());
        pipelines
            .create(
                &Requester::anonymous(),
                &PipelineConfig::new("build-1").with_attribute("stages", json!(["compile"])),
                "infra",
            )
            .await;
        let store = Arc::new(MemoryFingerprintStore::new());
        let guard = ConcurrencyGuard::new(
            store.clone(),
            FingerprintComputer::default(),
            pipelines.clone(),
        );
        (guard, pipelines, store)
    }

    async fn current(guard: &ConcurrencyGuard, name: &str) -> PipeconfResult<Fingerprint> {
        Ok(guard.read_with_caching(name, None).await?.fingerprint().clone())
    }

    fn changed() -> PipelineConfig {
        PipelineConfig::new("build-1").with_attribute("stages", json!(["compile", "test"]))
    }

    #[tokio::test]
    async fn first_read_populates_cache() {
        let (guard, _pipelines, store) = setup().await;

        let outcome = guard.read_with_caching("build-1", None).await.unwrap();
        assert!(matches!(outcome, ReadOutcome::Fresh { .. }));
        assert_eq!(store.get("BUILD-1").unwrap().as_ref(), Some(outcome.fingerprint()));
    }

    #[tokio::test]
    async fn presenting_current_validator_is_not_modified() {
        let (guard, _pipelines, _store) = setup().await;
        let fp = current(&guard, "build-1").await.unwrap();

        for _ in 0..3 {
            let outcome = guard
                .read_with_caching("build-1", Some(fp.as_str()))
                .await
                .unwrap();
            assert_eq!(outcome, ReadOutcome::NotModified { fingerprint: fp.clone() });
        }
    }

    #[tokio::test]
    async fn presenting_other_validator_is_fresh() {
        let (guard, _pipelines, _store) = setup().await;
        let outcome = guard
            .read_with_caching("build-1", Some("not-the-fingerprint"))
            .await
            .unwrap();

        match outcome {
            ReadOutcome::Fresh { pipeline, .. } => assert_eq!(pipeline.name, "build-1"),
            other => panic!("expected fresh read, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn missing_pipeline_is_not_found() {
        let (guard, _pipelines, store) = setup().await;
        let err = guard.read_with_caching("ghost", None).await.unwrap_err();
        assert!(matches!(err, PipeconfError::PipelineNotFound(name) if name == "ghost"));
        assert!(store.get("ghost").unwrap().is_none());
    }

    #[tokio::test]
    async fn cached_entry_is_authoritative_until_invalidated() {
        let (guard, pipelines, _store) = setup().await;
        let before = current(&guard, "build-1").await.unwrap();

        // Changed behind the guard's back
        pipelines.update(&Requester::anonymous(), &changed()).await;
        assert_eq!(current(&guard, "build-1").await.unwrap(), before);

        guard.on_successful_write("build-1", None);
        assert_ne!(current(&guard, "build-1").await.unwrap(), before);
    }

    #[tokio::test]
    async fn token_must_be_digest_of_current_fingerprint() {
        let (guard, _pipelines, _store) = setup().await;
        let fp = current(&guard, "build-1").await.unwrap();
        let token = guard.computer().precondition_token(fp.as_str());

        assert!(guard.validate_before_write("build-1", Some(&token)).await.is_ok());
        assert!(guard.validate_before_write("Build-1", Some(&token)).await.is_ok());

        for bad in [None, Some(fp.as_str()), Some(""), Some("garbage")] {
            let err = guard.validate_before_write("build-1", bad).await.unwrap_err();
            assert!(matches!(err, PipeconfError::StalePipelineConfig(_)));
        }
    }

    #[tokio::test]
    async fn validate_populates_empty_cache() {
        let (guard, _pipelines, store) = setup().await;
        assert!(store.is_empty());

        let _ = guard.validate_before_write("build-1", Some("whatever")).await;
        assert!(store.get("build-1").unwrap().is_some());
    }

    #[tokio::test]
    async fn validate_missing_pipeline_is_not_found() {
        let (guard, _pipelines, _store) = setup().await;
        let err = guard
            .validate_before_write("ghost", Some("token"))
            .await
            .unwrap_err();
        assert!(matches!(err, PipeconfError::PipelineNotFound(_)));
    }

    #[tokio::test]
    async fn token_from_prior_version_is_stale() {
        let (guard, pipelines, _store) = setup().await;
        let v1 = current(&guard, "build-1").await.unwrap();
        let old_token = guard.computer().precondition_token(v1.as_str());

        guard
            .validate_before_write("build-1", Some(&old_token))
            .await
            .unwrap();
        assert!(pipelines
            .update(&Requester::anonymous(), &changed())
            .await
            .is_successful());
        guard.on_successful_write("build-1", None);

        let v2 = current(&guard, "build-1").await.unwrap();
        assert_ne!(v1, v2);

        let err = guard
            .validate_before_write("build-1", Some(&old_token))
            .await
            .unwrap_err();
        assert!(matches!(err, PipeconfError::StalePipelineConfig(_)));
    }

    #[tokio::test]
    async fn rename_does_not_seed_new_name() {
        let (guard, _pipelines, store) = setup().await;
        current(&guard, "build-1").await.unwrap();

        guard.on_successful_write("build-1", Some("build-2"));
        assert!(store.get("build-1").unwrap().is_none());
        assert!(store.get("build-2").unwrap().is_none());
    }

    #[tokio::test]
    async fn broken_store_degrades_to_recompute() {
        let pipelines = Arc::new(MemoryPipelineStore::new());
        pipelines
            .create(&Requester::anonymous(), &PipelineConfig::new("build-1"), "infra")
            .await;
        let guard = ConcurrencyGuard::new(
            Arc::new(BrokenStore),
            FingerprintComputer::default(),
            pipelines,
        );

        let fp = current(&guard, "build-1").await.unwrap();
        let outcome = guard
            .read_with_caching("build-1", Some(fp.as_str()))
            .await
            .unwrap();
        assert!(matches!(outcome, ReadOutcome::NotModified { .. }));

        let token = guard.computer().precondition_token(fp.as_str());
        guard
            .validate_before_write("build-1", Some(&token))
            .await
            .unwrap();
        guard.on_successful_write("build-1", None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_reads_agree() {
        let (guard, _pipelines, store) = setup().await;
        let guard = Arc::new(guard);

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let guard = Arc::clone(&guard);
                tokio::spawn(async move { current(&guard, "build-1").await.unwrap() })
            })
            .collect();

        let mut seen = Vec::new();
        for task in tasks {
            seen.push(task.await.unwrap());
        }

        let cached = store.get("build-1").unwrap().unwrap();
        assert!(seen.iter().all(|fp| *fp == cached));
    }

    #[tokio::test]
    async fn hit_that_races_a_write_rereads_under_lock() {
        let pipelines = Arc::new(SlowPipelineStore::new(
            Duration::from_millis(100),
            Duration::ZERO,
        ));
        pipelines
            .inner
            .create(&Requester::anonymous(), &PipelineConfig::new("build-1"), "infra")
            .await;
        let guard = Arc::new(ConcurrencyGuard::new(
            Arc::new(MemoryFingerprintStore::new()),
            FingerprintComputer::default(),
            pipelines.clone(),
        ));
        let v1 = current(&guard, "build-1").await.unwrap();

        let reader = {
            let guard = Arc::clone(&guard);
            let v1 = v1.clone();
            tokio::spawn(async move { guard.read_with_caching("build-1", Some(v1.as_str())).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let lock = guard.lock("build-1").await;
        guard.invalidate("build-1");
        assert!(pipelines
            .inner
            .update(&Requester::anonymous(), &changed())
            .await
            .is_successful());
        guard.on_successful_write("build-1", None);
        let written = guard.read_locked("build-1", None).await.unwrap();
        drop(lock);

        assert_ne!(written.fingerprint(), &v1);
        assert_eq!(
            reader.await.unwrap().unwrap(),
            ReadOutcome::Fresh {
                pipeline: changed(),
                fingerprint: written.fingerprint().clone(),
            }
        );
    }

    #[tokio::test]
    async fn lock_is_per_name_and_case_insensitive() {
        let (guard, _pipelines, _store) = setup().await;

        let held = guard.lock("Build-1").await;
        let same = tokio::time::timeout(Duration::from_millis(50), guard.lock("build-1")).await;
        assert!(same.is_err());

        let other = tokio::time::timeout(Duration::from_millis(50), guard.lock("build-2")).await;
        assert!(other.is_ok());

        drop(held);
        let _relocked = guard.lock("BUILD-1").await;
    }
}
