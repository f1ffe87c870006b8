//! Fingerprint cache for optimistic concurrency control
//!
//! Provides content fingerprints ("ETags") for pipeline definitions and a
//! process-wide store keyed by pipeline name.
//!
//! # Protocol
//!
//! | Step | Client sends | Server compares against |
//! |------|--------------|-------------------------|
//! | Conditional read | `If-None-Match: "<fingerprint>"` | cached fingerprint |
//! | Write | `If-Match: "<digest(fingerprint)>"` | digest of cached fingerprint |
//!
//! The store is an optimization and a validation aid, never the source of
//! truth: an empty entry is always rebuilt from the current pipeline.

pub mod fingerprint;
pub mod store;

pub use fingerprint::{DigestAlgorithm, Fingerprint, FingerprintComputer, ResourceSnapshot};
pub use store::{FingerprintStore, MemoryFingerprintStore};
