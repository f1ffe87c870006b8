//! Serve command - run the HTTP admin API

use crate::api::{ApiServer, AppState, ServerEndpoint};
use crate::cli::args::ServeArgs;
use crate::config::{Config, ConfigManager, StorageBackend};
use crate::error::{PipeconfError, PipeconfResult};
use crate::ui::{self, UiContext};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

/// Apply command-line overrides to the loaded config
fn effective_config(args: &ServeArgs, config: &Config) -> Config {
    let mut config = config.clone();
    if let Some(host) = &args.host {
        config.server.host = host.clone();
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if args.in_memory {
        config.storage.backend = StorageBackend::Memory;
    }
    config
}

/// Record `addr` as the server for the configured data directory.
///
/// Fails if another server still listens for it. Returns the directory to
/// release on shutdown; memory-backed servers share nothing and claim none.
async fn claim_data_dir(config: &Config, addr: SocketAddr) -> PipeconfResult<Option<PathBuf>> {
    if config.storage.backend != StorageBackend::File {
        return Ok(None);
    }

    let data_dir = ConfigManager::data_dir(config);
    if let Some(other) = ServerEndpoint::discover(&data_dir).await? {
        if other.addr != addr && other.is_listening().await {
            return Err(PipeconfError::DataDirInUse {
                path: data_dir,
                addr: other.addr,
            });
        }
    }

    ServerEndpoint::new(addr).publish(&data_dir).await?;
    Ok(Some(data_dir))
}

/// Execute the serve command
pub async fn execute(args: ServeArgs, config: &Config) -> PipeconfResult<()> {
    let ctx = UiContext::detect();
    let config = effective_config(&args, config);

    let state = Arc::new(AppState::open(&config).await?);
    let server = ApiServer::bind(&config.server.bind_addr(), state).await?;
    let addr = server.local_addr()?;
    let claimed = claim_data_dir(&config, addr).await?;

    ui::step_ok_detail(&ctx, "Listening", &addr.to_string());
    match config.storage.backend {
        StorageBackend::File => ui::key_value(
            &ctx,
            "Data",
            &ConfigManager::data_dir(&config).display().to_string(),
        ),
        StorageBackend::Memory => ui::key_value(&ctx, "Data", "in memory"),
    }
    ui::key_value(&ctx, "ETag", &config.etag.algorithm.to_string());
    ui::remark(&ctx, "Press Ctrl-C to stop");

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await?;

    if let Some(data_dir) = claimed {
        ServerEndpoint::withdraw(&data_dir).await?;
    }
    ui::step_ok(&ctx, "Server stopped");
    Ok(())
}
