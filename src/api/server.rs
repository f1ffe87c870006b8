//! HTTP server setup and connection handling.

use super::router;
use super::state::AppState;
use crate::error::{PipeconfError, PipeconfResult};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

/// HTTP API server for pipeline configs.
pub struct ApiServer {
    listener: TcpListener,
    state: Arc<AppState>,
}

impl ApiServer {
    /// Bind to `addr`.
    pub async fn bind(addr: &str, state: Arc<AppState>) -> PipeconfResult<Self> {
        let listener = TcpListener::bind(addr).await.map_err(|e| PipeconfError::Bind {
            addr: addr.to_string(),
            source: e,
        })?;
        Ok(Self { listener, state })
    }

    /// Address actually bound, useful with port 0.
    pub fn local_addr(&self) -> PipeconfResult<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|e| PipeconfError::io("reading listener address", e))
    }

    /// Serve connections until `shutdown` resolves.
    pub async fn run_until<F>(self, shutdown: F) -> PipeconfResult<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        tracing::info!(addr = %self.local_addr()?, "API server started");

        loop {
            tokio::select! {
                result = self.listener.accept() => {
                    let (stream, remote_addr) = match result {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            tracing::warn!(error = %e, "Failed to accept connection");
                            continue;
                        }
                    };

                    let io = TokioIo::new(stream);
                    let state = Arc::clone(&self.state);

                    tokio::spawn(async move {
                        let service = service_fn(move |req| {
                            let state = Arc::clone(&state);
                            async move { router::route(req, state).await }
                        });

                        if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                            if !e.is_incomplete_message() {
                                tracing::warn!(
                                    remote = %remote_addr,
                                    error = %e,
                                    "HTTP connection error"
                                );
                            }
                        }
                    });
                }
                _ = &mut shutdown => {
                    tracing::info!("API server shutting down");
                    break;
                }
            }
        }

        Ok(())
    }
}
