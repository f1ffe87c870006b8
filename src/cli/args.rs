//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Pipeconf - pipeline config admin service
///
/// Serves pipeline definitions over HTTP with ETag-based optimistic
/// concurrency, and talks to the same store from the command line.
#[derive(Parser, Debug)]
#[command(name = "pipeconf")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "PIPECONF_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP admin API
    Serve(ServeArgs),

    /// Show a pipeline and its ETag
    Show(ShowArgs),

    /// Create a pipeline from a JSON file
    Create(CreateArgs),

    /// Update a pipeline, proving the copy is current with its ETag
    Update(UpdateArgs),

    /// Show or edit configuration
    Config(ConfigArgs),
}

/// Arguments for the serve command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Address to listen on (overrides server.host)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (overrides server.port)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Keep pipelines in memory only
    #[arg(long)]
    pub in_memory: bool,
}

/// Arguments for the show command
#[derive(Parser, Debug)]
pub struct ShowArgs {
    /// Pipeline name
    pub name: String,

    /// ETag from a previous read; prints "not modified" if still current
    #[arg(long)]
    pub etag: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

/// Arguments for the create command
#[derive(Parser, Debug)]
pub struct CreateArgs {
    /// Pipeline definition file, or - for stdin
    pub file: PathBuf,

    /// Pipeline group to create the pipeline in
    #[arg(short, long, default_value = "")]
    pub group: String,

    /// Acting user (defaults to $USER)
    #[arg(short, long, env = "PIPECONF_USER")]
    pub user: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

/// Arguments for the update command
#[derive(Parser, Debug)]
pub struct UpdateArgs {
    /// Pipeline name
    pub name: String,

    /// Pipeline definition file, or - for stdin
    pub file: PathBuf,

    /// ETag from the read this update is based on
    #[arg(short, long)]
    pub etag: String,

    /// Acting user (defaults to $USER)
    #[arg(short, long, env = "PIPECONF_USER")]
    pub user: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Config action
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., server.port)
        key: String,

        /// Value to set
        value: String,
    },
}

/// Output format for pipeline commands
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}
