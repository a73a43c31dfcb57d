//! Application configuration
//!
//! Defaults, then `WORLDWANDER_*` environment variables, then command-line
//! flags (applied by the binary on top of `from_env`).

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::client::DEFAULT_API_BASE;
use crate::identity::blocklist::DEFAULT_BLOCKED_CODES;
use crate::identity::Blocklist;
use crate::map::IdentityFields;

/// Public world-borders dataset used when no feature source is configured
pub const DEFAULT_FEATURES_SOURCE: &str =
    "https://raw.githubusercontent.com/datasets/geo-countries/master/data/countries.geojson";

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const ENV_API_BASE: &str = "WORLDWANDER_API_BASE";
pub const ENV_FEATURES: &str = "WORLDWANDER_FEATURES";
pub const ENV_DATA_DIR: &str = "WORLDWANDER_DATA_DIR";
pub const ENV_BLOCKLIST: &str = "WORLDWANDER_BLOCKLIST";
pub const ENV_TIMEOUT_SECS: &str = "WORLDWANDER_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{name} must be a positive number of seconds, got '{value}'")]
    InvalidTimeout { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Country provider base URL
    pub api_base: String,
    /// GeoJSON source: http(s) URL or local path
    pub features_source: String,
    /// Directory holding the persisted bucket list
    pub data_dir: PathBuf,
    /// Codes excluded from map interaction
    pub blocklist: Vec<String>,
    pub timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            features_source: DEFAULT_FEATURES_SOURCE.to_string(),
            data_dir: default_data_dir(),
            blocklist: DEFAULT_BLOCKED_CODES.iter().map(|s| s.to_string()).collect(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl AppConfig {
    /// Defaults overridden by the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overridden by any variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(api_base) = get(ENV_API_BASE) {
            config.api_base = api_base;
        }
        if let Some(features) = get(ENV_FEATURES) {
            config.features_source = features;
        }
        if let Some(dir) = get(ENV_DATA_DIR) {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(list) = lookup(ENV_BLOCKLIST) {
            // Set but empty disables the block-list
            config.blocklist = parse_code_list(&list);
        }
        if let Some(secs) = get(ENV_TIMEOUT_SECS) {
            config.timeout = parse_timeout(ENV_TIMEOUT_SECS, &secs)?;
        }

        log::debug!("Configuration: {:?}", config);
        Ok(config)
    }

    pub fn blocklist(&self) -> Blocklist {
        Blocklist::from_codes(self.blocklist.as_slice())
    }

    pub fn identity_fields(&self) -> IdentityFields {
        IdentityFields::with_blocklist(self.blocklist())
    }
}

/// Comma or whitespace separated codes
pub fn parse_code_list(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn parse_timeout(name: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidTimeout {
            name,
            value: raw.to_string(),
        }),
    }
}

fn default_data_dir() -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(".worldwander"),
        None => PathBuf::from(".worldwander"),
    }
}
