//! Application settings loaded from a TOML file.
//!
//! Every key is optional; missing sections fall back to the defaults below. The file
//! path comes from `CROWDFUND_CONFIG` and defaults to `./config.toml`. A missing file
//! is not an error, a malformed one is.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};

/// Default location of the settings file
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Top-level settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP listener
    pub server: ServerConfig,
    /// List sizes for view models
    pub pages: PageConfig,
    /// Donor group settings
    pub groups: GroupConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the server binds to
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
        }
    }
}

/// Upper bounds on list lengths
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PageConfig {
    /// Recent donations shown on a campaign
    pub donations: u64,
    /// Donations shown on a group page
    pub group_donations: u64,
    /// Messages shown in a group thread
    pub messages: u64,
    /// Notifications shown in the inbox
    pub notifications: u64,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            donations: 10,
            group_donations: 20,
            messages: 50,
            notifications: 50,
        }
    }
}

/// Donor group settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GroupConfig {
    /// Length of generated join codes
    pub join_code_length: usize,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            join_code_length: 8,
        }
    }
}

/// Loads settings from a TOML file
///
/// # Arguments
/// * `path` - Path to the settings file
///
/// # Errors
/// Returns an error if the file cannot be read or the TOML is invalid.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;

    parse_config(&contents)
}

/// Parses settings from TOML text.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    let config: AppConfig = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config file: {e}"),
    })?;
    if config.groups.join_code_length == 0 {
        return Err(Error::Config {
            message: "groups.join_code_length must be at least 1".to_string(),
        });
    }
    Ok(config)
}

/// Loads settings from `CROWDFUND_CONFIG` or `./config.toml`, using defaults when
/// the file does not exist.
pub fn load_app_config() -> Result<AppConfig> {
    let path = std::env::var("CROWDFUND_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    if Path::new(&path).exists() {
        info!("Loading configuration from {}", path);
        load_config(&path)
    } else {
        warn!("Config file {} not found, using defaults", path);
        Ok(AppConfig::default())
    }
}
