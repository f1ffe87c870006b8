//! HTTP admin API for pipeline configs.
//!
//! Pure hyper 1.x over HTTP/1.1, one task per connection.
//!
//! ```text
//! ApiServer ── router ── handlers ── ConcurrencyGuard ── PipelineGateway
//!                            │
//!                            └── PauseService, AuditLog
//! ```
//!
//! Reads return the pipeline's fingerprint in `ETag`. A client that sends it
//! back in `If-None-Match` gets `304 Not Modified`. Writes must send
//! `If-Match: "<digest of the fingerprint>"` or are rejected with
//! `412 Precondition Failed`.
//!
//! A file-backed server records its address in the data directory (see
//! [`ServerEndpoint`]); CLI commands sharing that directory talk to it
//! instead of opening the store themselves.

pub mod endpoint;
mod error;
pub mod handlers;
pub mod representer;
pub mod request;
mod response;
pub mod router;
mod server;
mod state;

pub use endpoint::ServerEndpoint;
pub use error::ApiError;
pub use router::{dispatch, route, PIPELINES_PATH};
pub use server::ApiServer;
pub use state::{ApiSettings, AppState};
