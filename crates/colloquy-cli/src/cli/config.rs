//! Configuration resolution shared by `run` and `check-config`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use console::style;

use colloquy_infra::config::{default_config_path, load_session_config, read_session_config};
use colloquy_types::config::{ChannelConfig, SessionConfig, TransportKind};

use super::RunArgs;

/// Load the config file: strict when `explicit` is given, tolerant for the
/// default location. Returns the config and the path it came from.
pub async fn load(explicit: Option<PathBuf>) -> Result<(SessionConfig, Option<PathBuf>)> {
    if let Some(path) = explicit {
        let config = read_session_config(&path)
            .await
            .with_context(|| format!("cannot use config file {}", path.display()))?;
        return Ok((config, Some(path)));
    }
    match default_config_path() {
        Some(path) => Ok((load_session_config(&path).await, Some(path))),
        None => Ok((SessionConfig::default(), None)),
    }
}

/// Guess the transport from an endpoint's URL scheme.
pub fn infer_transport(endpoint: &str) -> TransportKind {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        TransportKind::HttpStream
    } else {
        TransportKind::Websocket
    }
}

/// Layer command-line overrides on top of the file config.
pub fn apply_overrides(mut config: SessionConfig, args: &RunArgs) -> SessionConfig {
    if !args.endpoints.is_empty() {
        config.channels = args
            .endpoints
            .iter()
            .map(|endpoint| {
                let transport = args.transport.unwrap_or_else(|| infer_transport(endpoint));
                ChannelConfig::new(endpoint.clone(), transport)
            })
            .collect();
    } else if let Some(transport) = args.transport {
        for channel in &mut config.channels {
            channel.transport = transport;
        }
    }

    for channel in &mut config.channels {
        channel.auto_start |= args.auto_start;
        channel.auto_continue |= args.auto_continue;
    }
    if let Some(secs) = args.connect_timeout {
        config.reconnect.connect_timeout_secs = secs;
    }
    if let Some(max_retries) = args.max_retries {
        config.reconnect.max_retries = max_retries;
    }
    config
}

/// `colloquy check-config`: print the resolved configuration.
pub async fn check_config(explicit: Option<PathBuf>, json: bool) -> Result<()> {
    let (config, source) = load(explicit).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    println!();
    match &source {
        Some(path) if path.exists() => println!(
            "  {} Config loaded from {}",
            style("✓").green(),
            style(path.display()).cyan()
        ),
        Some(path) => println!(
            "  {} No config at {}, using defaults",
            style("·").dim(),
            style(path.display()).dim()
        ),
        None => println!("  {} No config directory, using defaults", style("·").dim()),
    }
    if config.channels.is_empty() {
        println!(
            "  {} No channels configured; pass --endpoint to `colloquy run`",
            style("!").yellow()
        );
    }
    println!();
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}
