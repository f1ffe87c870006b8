//! Config command - show or edit configuration

use crate::cache::DigestAlgorithm;
use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{Config, ConfigManager, StorageBackend};
use crate::error::{PipeconfError, PipeconfResult};
use crate::ui::{self, UiContext};
use std::path::PathBuf;

/// Keys accepted by `config set`
const VALID_KEYS: [&str; 10] = [
    "general.log_format",
    "general.audit_log",
    "server.host",
    "server.port",
    "server.max_body_bytes",
    "storage.data_dir",
    "storage.backend",
    "etag.algorithm",
    "pipelines.pause_on_create",
    "pipelines.pause_cause",
];

/// Execute the config command
pub async fn execute(
    args: ConfigArgs,
    manager: &ConfigManager,
    config: &Config,
) -> PipeconfResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(config)?,
        Some(ConfigAction::Path) => println!("{}", manager.path().display()),
        Some(ConfigAction::Init { force }) => init_config(manager, force).await?,
        Some(ConfigAction::Set { key, value }) => {
            let ctx = UiContext::detect();
            let mut config = config.clone();
            if let Err(e) = apply(&mut config, &key, &value) {
                ui::step_error_detail(&ctx, "Cannot set config key", &key);
                ui::remark(&ctx, &format!("Valid keys: {}", VALID_KEYS.join(", ")));
                return Err(e);
            }
            manager.save(&config).await?;
            ui::step_ok(&ctx, &format!("Set {} = {}", key, value));
        }
    }

    Ok(())
}

fn show_config(config: &Config) -> PipeconfResult<()> {
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

async fn init_config(manager: &ConfigManager, force: bool) -> PipeconfResult<()> {
    let ctx = UiContext::detect();
    let path = manager.path();

    if path.exists() && !force {
        ui::step_warn_hint(
            &ctx,
            &format!("Config already exists at {}", path.display()),
            "Use --force to overwrite",
        );
        return Ok(());
    }

    manager.save(&Config::default()).await?;
    ui::step_ok_detail(&ctx, "Configuration initialized", &path.display().to_string());
    Ok(())
}

/// Set a dot-separated key on `config`
fn apply(config: &mut Config, key: &str, value: &str) -> PipeconfResult<()> {
    let parts: Vec<&str> = key.split('.').collect();

    match parts.as_slice() {
        ["general", "log_format"] => config.general.log_format = parse_log_format(value)?,
        ["general", "audit_log"] => config.general.audit_log = parse_bool(value)?,

        ["server", "host"] => config.server.host = value.to_string(),
        ["server", "port"] => config.server.port = parse_number(value)?,
        ["server", "max_body_bytes"] => config.server.max_body_bytes = parse_number(value)?,

        ["storage", "data_dir"] => config.storage.data_dir = Some(PathBuf::from(value)),
        ["storage", "backend"] => {
            config.storage.backend = value.parse::<StorageBackend>().map_err(PipeconfError::User)?
        }

        ["etag", "algorithm"] => {
            config.etag.algorithm = value.parse::<DigestAlgorithm>().map_err(PipeconfError::User)?
        }

        ["pipelines", "pause_on_create"] => config.pipelines.pause_on_create = parse_bool(value)?,
        ["pipelines", "pause_cause"] => config.pipelines.pause_cause = value.to_string(),

        _ => return Err(PipeconfError::User(format!("Unknown config key: {}", key))),
    }

    Ok(())
}

fn parse_log_format(value: &str) -> PipeconfResult<String> {
    match value {
        "text" | "json" => Ok(value.to_string()),
        _ => Err(PipeconfError::User(format!(
            "Invalid log format: {}. Use text/json",
            value
        ))),
    }
}

fn parse_bool(value: &str) -> PipeconfResult<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(PipeconfError::User(format!(
            "Invalid boolean value: {}. Use true/false",
            value
        ))),
    }
}

fn parse_number<T: std::str::FromStr>(value: &str) -> PipeconfResult<T> {
    value
        .parse()
        .map_err(|_| PipeconfError::User(format!("Invalid number: {}", value)))
}
