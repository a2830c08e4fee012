//! Top-level application configuration.
//!
//! Configuration is stored in `.foodshare/config.yaml` and includes:
//! - Listings server location and HTTP timeouts
//! - Buffer capacity and page size for the listings pipeline
//! - Scroll trigger margin and refresh debounce interval

use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::buffer::BufferSettings;
use crate::error::{ListingsError, Result};

/// Directory holding local foodshare state
pub const CONFIG_DIR: &str = ".foodshare";

/// Environment variable overriding `server.base_url`
pub const BASE_URL_ENV: &str = "FOODSHARE_BASE_URL";

/// Keys accepted by `config set`
pub const VALID_KEYS: &[&str] = &[
    "server.base_url",
    "server.connect_timeout_secs",
    "server.request_timeout_secs",
    "listings.buffer_capacity",
    "listings.retrieval_amount",
    "listings.fetch_timeout_secs",
    "listings.load_margin",
    "listings.refresh_debounce_ms",
];

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Listings server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Listings pipeline settings
    #[serde(default)]
    pub listings: ListingsConfig,
}

/// Listings server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            connect_timeout_secs: default_connect_timeout(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_request_timeout() -> u64 {
    60
}

/// Listings pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingsConfig {
    /// Items kept prefetched beyond what has been requested (default: 5)
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,

    /// Items requested per page (default: 5)
    #[serde(default = "default_retrieval_amount")]
    pub retrieval_amount: usize,

    /// Per-fetch timeout; unset means a hung fetch is never abandoned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetch_timeout_secs: Option<u64>,

    /// Distance from the bottom of the document that triggers a load (default: 100)
    #[serde(default = "default_load_margin")]
    pub load_margin: f64,

    /// Quiet period before a filter change refreshes the list (default: 1500)
    #[serde(default = "default_refresh_debounce")]
    pub refresh_debounce_ms: u64,
}

impl Default for ListingsConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: default_buffer_capacity(),
            retrieval_amount: default_retrieval_amount(),
            fetch_timeout_secs: None,
            load_margin: default_load_margin(),
            refresh_debounce_ms: default_refresh_debounce(),
        }
    }
}

fn default_buffer_capacity() -> usize {
    crate::buffer::DEFAULT_BUFFER_CAPACITY
}

fn default_retrieval_amount() -> usize {
    crate::paging::DEFAULT_RETRIEVAL_AMOUNT
}

fn default_load_margin() -> f64 {
    crate::scroll::DEFAULT_LOAD_MARGIN
}

fn default_refresh_debounce() -> u64 {
    crate::debounce::DEFAULT_REFRESH_DEBOUNCE_MS
}

impl Config {
    /// Get the path to the config file
    pub fn config_path() -> PathBuf {
        PathBuf::from(CONFIG_DIR).join("config.yaml")
    }

    /// Load configuration from file, or return default if not found
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(&path)?;
        let config: Config = serde_yaml_ng::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();

        // Ensure .foodshare directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_yaml_ng::to_string(self)?;
        fs::write(&path, content)?;
        Ok(())
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.listings.retrieval_amount == 0 {
            return Err(ListingsError::Config(
                "listings.retrieval_amount must be greater than 0".to_string(),
            ));
        }
        if !self.listings.load_margin.is_finite() || self.listings.load_margin < 0.0 {
            return Err(ListingsError::Config(
                "listings.load_margin must be a non-negative number".to_string(),
            ));
        }
        Ok(())
    }

    /// Get the server base URL, preferring the environment variable
    pub fn base_url(&self) -> Result<Url> {
        let raw = match env::var(BASE_URL_ENV) {
            Ok(url) if !url.is_empty() => url,
            _ => self.server.base_url.clone(),
        };

        Url::parse(&raw).map_err(|e| ListingsError::Config(format!("invalid base URL '{raw}': {e}")))
    }

    /// Buffer settings derived from the listings section
    pub fn buffer_settings(&self) -> BufferSettings {
        BufferSettings {
            capacity: self.listings.buffer_capacity,
            fetch_timeout: self.listings.fetch_timeout_secs.map(Duration::from_secs),
        }
    }

    /// Debounce interval for filter-driven refreshes
    pub fn refresh_debounce(&self) -> Duration {
        Duration::from_millis(self.listings.refresh_debounce_ms)
    }

    /// Read a single value by dotted key
    pub fn get_value(&self, key: &str) -> Result<String> {
        let value = match key {
            "server.base_url" => self.server.base_url.clone(),
            "server.connect_timeout_secs" => self.server.connect_timeout_secs.to_string(),
            "server.request_timeout_secs" => self.server.request_timeout_secs.to_string(),
            "listings.buffer_capacity" => self.listings.buffer_capacity.to_string(),
            "listings.retrieval_amount" => self.listings.retrieval_amount.to_string(),
            "listings.fetch_timeout_secs" => match self.listings.fetch_timeout_secs {
                Some(secs) => secs.to_string(),
                None => return Err(ListingsError::Config(format!("{key} is not set"))),
            },
            "listings.load_margin" => self.listings.load_margin.to_string(),
            "listings.refresh_debounce_ms" => self.listings.refresh_debounce_ms.to_string(),
            _ => return Err(unknown_key(key)),
        };
        Ok(value)
    }

    /// Set a single value by dotted key
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "server.base_url" => {
                Url::parse(value).map_err(|e| {
                    ListingsError::Config(format!("invalid base URL '{value}': {e}"))
                })?;
                self.server.base_url = value.to_string();
            }
            "server.connect_timeout_secs" => {
                self.server.connect_timeout_secs = parse_number(key, value)?;
            }
            "server.request_timeout_secs" => {
                self.server.request_timeout_secs = parse_number(key, value)?;
            }
            "listings.buffer_capacity" => {
                self.listings.buffer_capacity = parse_number(key, value)?;
            }
            "listings.retrieval_amount" => {
                self.listings.retrieval_amount = parse_number(key, value)?;
            }
            "listings.fetch_timeout_secs" => {
                self.listings.fetch_timeout_secs = if value.eq_ignore_ascii_case("none") {
                    None
                } else {
                    Some(parse_number(key, value)?)
                };
            }
            "listings.load_margin" => {
                self.listings.load_margin = parse_number(key, value)?;
            }
            "listings.refresh_debounce_ms" => {
                self.listings.refresh_debounce_ms = parse_number(key, value)?;
            }
            _ => return Err(unknown_key(key)),
        }
        self.validate()
    }
}

fn unknown_key(key: &str) -> ListingsError {
    ListingsError::Config(format!(
        "unknown config key '{key}'. Valid keys: {}",
        VALID_KEYS.join(", ")
    ))
}

fn parse_number<N: std::str::FromStr>(key: &str, value: &str) -> Result<N> {
    value
        .trim()
        .parse()
        .map_err(|_| ListingsError::Config(format!("invalid value '{value}' for {key}")))
}
