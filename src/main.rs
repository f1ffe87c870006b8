//! Pipeconf - pipeline config admin service
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use pipeconf::cli::{Cli, Commands};
use pipeconf::config::{Config, ConfigManager};
use pipeconf::error::PipeconfResult;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8, config: &Config) {
    // 0 = warn, 1 = info, 2+ = debug
    let filter = match verbose {
        0 => EnvFilter::new("pipeconf=warn"),
        1 => EnvFilter::new("pipeconf=info"),
        _ => EnvFilter::new("pipeconf=debug"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if config.general.log_format == "json" {
        builder.json().init();
    } else {
        builder.without_time().init();
    }
}

async fn run() -> PipeconfResult<()> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let config = config_manager.load().await?;

    init_logging(cli.verbose, &config);
    tracing::debug!("Using config {}", config_manager.path().display());

    match cli.command {
        Commands::Serve(args) => pipeconf::cli::commands::serve(args, &config).await,
        Commands::Show(args) => pipeconf::cli::commands::show(args, &config).await,
        Commands::Create(args) => pipeconf::cli::commands::create(args, &config).await,
        Commands::Update(args) => pipeconf::cli::commands::update(args, &config).await,
        Commands::Config(args) => {
            pipeconf::cli::commands::config(args, &config_manager, &config).await
        }
    }
}
