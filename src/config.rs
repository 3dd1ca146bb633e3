use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::common::error::{CollectionError, Result};
use crate::logging;

/// Settings for the capture-to-collection converter
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ConverterConfig {
    /// Request headers dropped during conversion, compared case-insensitively
    #[serde(default = "default_skip_headers")]
    pub skip_headers: Vec<String>,
    #[serde(default = "default_max_name_length")]
    pub max_name_length: usize,
    #[serde(default = "default_method")]
    pub default_method: String,
    /// Folder name for entries whose URL has no host
    #[serde(default = "default_unknown_host_label")]
    pub unknown_host_label: String,
}

fn default_skip_headers() -> Vec<String> {
    ["host", "content-length", "connection", "accept-encoding"]
        .iter()
        .map(|h| h.to_string())
        .collect()
}

fn default_max_name_length() -> usize {
    50
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_unknown_host_label() -> String {
    "unknown".to_string()
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            skip_headers: default_skip_headers(),
            max_name_length: default_max_name_length(),
            default_method: default_method(),
            unknown_host_label: default_unknown_host_label(),
        }
    }
}

impl ConverterConfig {
    pub fn skips_header(&self, name: &str) -> bool {
        self.skip_headers
            .iter()
            .any(|skipped| skipped.eq_ignore_ascii_case(name))
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub verbose_logging: bool,
    /// Root for `logs/app.log` and the domain logs; terminal only when unset
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    #[serde(default)]
    pub converter: ConverterConfig,
}

/// `<config dir>/collection-kit/config.json`, when the platform has one
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("collection-kit").join("config.json"))
}

/// Load the configuration, falling back to defaults when the file is
/// missing or unreadable.
pub fn load_config(path: &Path) -> AppConfig {
    if !path.exists() {
        return AppConfig::default();
    }

    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            log::warn!("Failed to read {:?}, using defaults: {}", path, e);
            return AppConfig::default();
        }
    };

    match serde_json::from_str::<AppConfig>(&content) {
        Ok(config) => config,
        Err(e) => {
            log::warn!("Failed to parse {:?}, using defaults: {}", path, e);
            AppConfig::default()
        }
    }
}

pub fn save_config(path: &Path, config: &AppConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    let json = serde_json::to_string_pretty(config)
        .map_err(|e| CollectionError::Format(e.to_string()))?;
    fs::write(path, json)?;
    let _ = logging::write_domain_log("audit", "Updated application configuration");
    Ok(())
}
