//! Configuration commands.
//!
//! - `config show`: Display the effective configuration
//! - `config set`: Set a configuration value
//! - `config get`: Print one configuration value

use std::env;

use owo_colors::OwoColorize;
use serde_json::json;

use super::CommandOutput;
use crate::cli::OutputOptions;
use crate::config::{BASE_URL_ENV, Config, VALID_KEYS};
use crate::error::Result;

/// Show current configuration
pub fn cmd_config_show(output: OutputOptions) -> Result<()> {
    let config = Config::load()?;
    let base_url = config.base_url()?;
    let env_override = env::var(BASE_URL_ENV).is_ok_and(|url| !url.is_empty());

    let json_output = json!({
        "server": {
            "base_url": config.server.base_url,
            "effective_base_url": base_url.as_str(),
            "connect_timeout_secs": config.server.connect_timeout_secs,
            "request_timeout_secs": config.server.request_timeout_secs,
        },
        "listings": {
            "buffer_capacity": config.listings.buffer_capacity,
            "retrieval_amount": config.listings.retrieval_amount,
            "fetch_timeout_secs": config.listings.fetch_timeout_secs,
            "load_margin": config.listings.load_margin,
            "refresh_debounce_ms": config.listings.refresh_debounce_ms,
        },
        "config_file": Config::config_path().to_string_lossy(),
    });

    let mut text_output = String::new();
    text_output.push_str(&format!("{}\n\n", "Configuration:".cyan().bold()));

    let mut section = "";
    for &key in VALID_KEYS {
        let (prefix, name) = key.split_once('.').unwrap_or(("", key));
        if prefix != section {
            if !section.is_empty() {
                text_output.push('\n');
            }
            text_output.push_str(&format!("{}:\n", prefix.cyan()));
            section = prefix;
        }

        let value = match config.get_value(key) {
            Ok(value) => value,
            Err(_) => "not set".dimmed().to_string(),
        };
        text_output.push_str(&format!("  {name}: {value}\n"));
    }

    if env_override {
        text_output.push_str(&format!(
            "\n{}\n",
            format!("{BASE_URL_ENV} overrides base_url: {base_url}").yellow()
        ));
    }

    text_output.push('\n');
    text_output.push_str(&format!(
        "{}",
        format!("Config file: {}", Config::config_path().display()).dimmed()
    ));

    CommandOutput::new(json_output)
        .with_text(text_output)
        .print(output)
}

/// Set a configuration value
pub fn cmd_config_set(key: &str, value: &str, output: OutputOptions) -> Result<()> {
    let mut config = Config::load()?;
    config.set_value(key, value)?;
    config.save()?;

    let stored = config.get_value(key).ok();
    tracing::debug!(key, value = stored.as_deref(), "configuration updated");

    let json_output = json!({
        "action": "config_set",
        "key": key,
        "value": stored,
        "success": true,
    });
    let text_output = match &stored {
        Some(stored) => format!("Set {} = {}", key.cyan(), stored),
        None => format!("Cleared {}", key.cyan()),
    };

    CommandOutput::new(json_output)
        .with_text(text_output)
        .print(output)
}

/// Print a single configuration value
pub fn cmd_config_get(key: &str) -> Result<()> {
    let config = Config::load()?;
    println!("{}", config.get_value(key)?);
    Ok(())
}
