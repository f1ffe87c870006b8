//! Pipeconf - pipeline config admin service
//!
//! Serves named pipeline definitions for read, create and update, and
//! rejects updates made against a stale copy using content fingerprints
//! (ETags) cached per pipeline name.

pub mod api;
pub mod audit;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod guard;
pub mod messages;
pub mod pipeline;
pub mod ui;

pub use error::{PipeconfError, PipeconfResult};
pub use guard::{ConcurrencyGuard, ReadOutcome};
