//! Configuration file support for nestland
//!
//! Reads from .nestland/config.toml

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration structure
#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq)]
pub struct Config {
    /// The single admin identity
    #[serde(default)]
    pub admin: AdminConfig,

    /// Dashboard API server settings
    #[serde(default)]
    pub serve: ServeConfig,

    /// Default databases for `nestland sync`
    #[serde(default)]
    pub sync: SyncConfig,

    /// Comment notification settings
    #[serde(default)]
    pub notify: NotifyConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Admin identity. Admin-only API calls must present `token`.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AdminConfig {
    /// Default: "admin@nestland.local"
    #[serde(default = "default_admin_email")]
    pub email: String,

    /// Shared secret for the `X-Admin-Token` header.
    /// Unset disables admin endpoints in the API.
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ServeConfig {
    /// Default: "127.0.0.1"
    #[serde(default = "default_host")]
    pub host: String,

    /// Default: 3000
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq)]
pub struct SyncConfig {
    /// Legacy database to copy from
    #[serde(default)]
    pub source: Option<PathBuf>,

    /// Primary database to copy into
    #[serde(default)]
    pub target: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq)]
pub struct NotifyConfig {
    /// Shell command run for each new comment, JSON on stdin.
    /// Unset logs comments instead.
    #[serde(default)]
    pub command: Option<String>,
}

fn default_admin_email() -> String {
    "admin@nestland.local".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            email: default_admin_email(),
            token: None,
        }
    }
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Config {
    /// Load config from .nestland/config.toml
    /// Returns default config if file doesn't exist or can't be parsed
    pub fn load() -> Self {
        match Self::find_config_path() {
            Some(path) => Self::load_from(&path).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "ignoring config file");
                Self::default()
            }),
            None => Self::default(),
        }
    }

    /// Load config from an explicit path
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Find config.toml by walking up directory tree
    fn find_config_path() -> Option<PathBuf> {
        let current_dir = std::env::current_dir().ok()?;
        let mut dir = current_dir.as_path();

        loop {
            let config_path = dir.join(".nestland").join("config.toml");
            if config_path.exists() {
                return Some(config_path);
            }

            match dir.parent() {
                Some(parent) => dir = parent,
                None => break,
            }
        }
        None
    }

    /// True when `token` matches the configured admin token
    pub fn is_admin_token(&self, token: Option<&str>) -> bool {
        match (&self.admin.token, token) {
            (Some(expected), Some(given)) => !expected.is_empty() && expected == given,
            _ => false,
        }
    }

    /// Serialized form written by `nestland init`
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }
}
