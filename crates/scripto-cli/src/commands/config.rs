//! Config command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use scripto_core::Config;

use crate::output::{Output, OutputFormat};

const VALID_KEYS: &str = "api_url, ws_url, data_dir, search_debounce_ms, request_timeout_secs, \
                          reconnect, initial_reconnect_delay_ms, max_reconnect_delay_ms, \
                          vote_mode, log_file";

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "api_url": config.api_url,
                    "ws_url": config.ws_url,
                    "data_dir": config.data_dir,
                    "search_debounce_ms": config.search_debounce_ms,
                    "request_timeout_secs": config.request_timeout_secs,
                    "reconnect": config.reconnect,
                    "initial_reconnect_delay_ms": config.initial_reconnect_delay_ms,
                    "max_reconnect_delay_ms": config.max_reconnect_delay_ms,
                    "vote_mode": config.vote_mode,
                    "log_file": config.log_file
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.api_url);
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  api_url:                    {}", config.api_url);
            println!("  ws_url:                     {}", config.ws_url);
            println!("  data_dir:                   {}", config.data_dir.display());
            println!("  search_debounce_ms:         {}", config.search_debounce_ms);
            println!(
                "  request_timeout_secs:       {}",
                config
                    .request_timeout_secs
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            println!("  reconnect:                  {}", config.reconnect);
            println!("  initial_reconnect_delay_ms: {}", config.initial_reconnect_delay_ms);
            println!("  max_reconnect_delay_ms:     {}", config.max_reconnect_delay_ms);
            println!("  vote_mode:                  {}", config.vote_mode);
            println!(
                "  log_file:                   {}",
                config
                    .log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(
    key: String,
    value: String,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    let mut config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    apply(&mut config, &key, &value)?;

    match config_path {
        Some(path) => config.save_to_path(path),
        None => config.save(),
    }
    .context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}

fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    let unset = value.is_empty() || value == "none";

    match key {
        "api_url" => config.api_url = value.to_string(),
        "ws_url" => config.ws_url = value.to_string(),
        "data_dir" => config.data_dir = value.into(),
        "search_debounce_ms" => {
            config.search_debounce_ms = value
                .parse()
                .context("Invalid value for search_debounce_ms. Use a number of milliseconds.")?;
        }
        "request_timeout_secs" => {
            config.request_timeout_secs = if unset {
                None
            } else {
                Some(value.parse().context(
                    "Invalid value for request_timeout_secs. Use a number of seconds or 'none'.",
                )?)
            };
        }
        "reconnect" => {
            config.reconnect = value
                .parse()
                .context("Invalid value for reconnect. Use 'true' or 'false'.")?;
        }
        "initial_reconnect_delay_ms" => {
            config.initial_reconnect_delay_ms = value
                .parse()
                .context("Invalid value for initial_reconnect_delay_ms")?;
        }
        "max_reconnect_delay_ms" => {
            config.max_reconnect_delay_ms = value
                .parse()
                .context("Invalid value for max_reconnect_delay_ms")?;
        }
        "vote_mode" => config.vote_mode = value.parse()?,
        "log_file" => {
            config.log_file = if unset { None } else { Some(value.into()) };
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\nValid keys: {}",
                key,
                VALID_KEYS
            );
        }
    }

    Ok(())
}
