//! Requests against the configured pipeline store
//!
//! CLI commands build the same HTTP requests a remote client would. When a
//! `serve` process owns the data directory they are sent to it, so its
//! fingerprint cache sees every write. Otherwise they run in-process through
//! the API router over the store.

use crate::api::{self, AppState, ServerEndpoint};
use crate::cli::args::OutputFormat;
use crate::config::{Config, ConfigManager, StorageBackend};
use crate::error::{PipeconfError, PipeconfResult};
use crate::ui::{self, UiContext};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Body;
use hyper::header::ETAG;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde_json::Value;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tracing::debug;

/// Status, validator and JSON body of a response
#[derive(Debug)]
pub struct Reply {
    pub status: StatusCode,
    pub etag: Option<String>,
    pub body: Option<Value>,
}

impl Reply {
    /// Collect a response of either origin
    async fn read<B>(response: Response<B>) -> PipeconfResult<Self>
    where
        B: Body,
        B::Error: std::fmt::Display,
    {
        let status = response.status();
        let etag = response
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(|v| unquote(v).to_string());

        let bytes = response
            .into_body()
            .collect()
            .await
            .map_err(|e| PipeconfError::Internal(format!("reading response body: {}", e)))?
            .to_bytes();
        let body = if bytes.is_empty() {
            None
        } else {
            Some(serde_json::from_slice(&bytes)?)
        };

        Ok(Self { status, etag, body })
    }

    /// Turn error statuses into `PipeconfError::Rejected`
    pub fn into_success(self) -> PipeconfResult<Self> {
        if self.status.is_success() || self.status == StatusCode::NOT_MODIFIED {
            return Ok(self);
        }

        let field = |name: &str| {
            self.body
                .as_ref()
                .and_then(|b| b.get(name))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        Err(PipeconfError::Rejected {
            status: self.status.as_u16(),
            message_key: field("message_key"),
            message: field("message"),
        })
    }
}

/// Where a command's requests are handled
pub enum Target {
    /// The running server that owns the data directory
    Server(SocketAddr),
    /// This process, over the configured store
    InProcess(Arc<AppState>),
}

/// Pick the running server for the data directory, or open the store here
pub async fn open_target(config: &Config, ctx: &UiContext) -> PipeconfResult<Target> {
    match config.storage.backend {
        StorageBackend::File => {
            let data_dir = ConfigManager::data_dir(config);
            if let Some(endpoint) = ServerEndpoint::discover(&data_dir).await? {
                if endpoint.is_listening().await {
                    debug!(addr = %endpoint.addr, "Sending requests to running server");
                    return Ok(Target::Server(endpoint.addr));
                }
                ui::step_warn_hint(
                    ctx,
                    &format!("No server listening at {}", endpoint.addr),
                    "Using the data directory directly",
                );
            }
        }
        StorageBackend::Memory => ui::step_warn_hint(
            ctx,
            "Memory backend starts empty for every command",
            "Use storage.backend = \"file\" outside of `serve`",
        ),
    }

    Ok(Target::InProcess(Arc::new(AppState::open(config).await?)))
}

/// Host used for links in locally rendered responses
pub fn host(config: &Config) -> String {
    config.server.bind_addr()
}

/// Acting user: explicit, then `$USER`, then anonymous
pub fn requester_name(user: Option<String>) -> String {
    user.or_else(|| std::env::var("USER").ok())
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| "anonymous".to_string())
}

/// Strip surrounding quotes a user may have copied from an `ETag` header
pub fn unquote(etag: &str) -> &str {
    let etag = etag.trim();
    let etag = etag.strip_prefix("W/").unwrap_or(etag);
    etag.strip_prefix('"')
        .and_then(|e| e.strip_suffix('"'))
        .unwrap_or(etag)
}

/// Read a pipeline definition from a file, or stdin for `-`
pub async fn read_definition(path: &Path) -> PipeconfResult<Value> {
    let content = if path == Path::new("-") {
        let mut content = String::new();
        tokio::io::stdin()
            .read_to_string(&mut content)
            .await
            .map_err(|e| PipeconfError::io("reading pipeline from stdin", e))?;
        content
    } else {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| PipeconfError::io(format!("reading pipeline from {}", path.display()), e))?
    };

    serde_json::from_str(&content)
        .map_err(|e| PipeconfError::User(format!("Pipeline definition is not valid JSON: {}", e)))
}

/// Build a request, reporting bad names as user errors
pub fn build(
    builder: hyper::http::request::Builder,
    body: Bytes,
) -> PipeconfResult<Request<Bytes>> {
    builder
        .body(body)
        .map_err(|e| PipeconfError::User(format!("Invalid request: {}", e)))
}

/// Handle a request at `target`
pub async fn send(target: &Target, req: Request<Bytes>) -> PipeconfResult<Reply> {
    match target {
        Target::InProcess(state) => Reply::read(api::dispatch(req, Arc::clone(state)).await).await,
        Target::Server(addr) => forward(*addr, req).await,
    }
}

/// Send a request to the server at `addr` over HTTP/1.1
async fn forward(addr: SocketAddr, req: Request<Bytes>) -> PipeconfResult<Reply> {
    let failed = |reason: String| PipeconfError::Server { addr, reason };

    let stream = TcpStream::connect(addr)
        .await
        .map_err(|e| failed(format!("connect: {}", e)))?;
    let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
        .await
        .map_err(|e| failed(format!("handshake: {}", e)))?;

    tokio::spawn(async move {
        if let Err(e) = conn.await {
            debug!(error = %e, "Server connection closed");
        }
    });

    let response = sender
        .send_request(req.map(Full::new))
        .await
        .map_err(|e| failed(e.to_string()))?;
    Reply::read(response).await
}

/// Print a reply in the requested format
pub fn print_reply(ctx: &UiContext, reply: &Reply, format: OutputFormat) -> PipeconfResult<()> {
    match format {
        OutputFormat::Json => {
            let out = serde_json::json!({
                "status": reply.status.as_u16(),
                "etag": reply.etag,
                "body": reply.body,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Text => {
            let ok = reply.status.is_success();
            ui::key_value_status(ctx, "Status", &reply.status.to_string(), ok);
            if let Some(etag) = &reply.etag {
                ui::key_value(ctx, "ETag", etag);
            }
            match &reply.body {
                Some(body) => println!("{}", serde_json::to_string_pretty(body)?),
                None => ui::remark(ctx, "Not modified"),
            }
        }
    }
    Ok(())
}
