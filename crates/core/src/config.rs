//! Client configuration.
//!
//! Resolution order: built-in defaults, then a YAML file, then environment
//! variables. CLI flags are applied on top by the interface crate.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

pub const ENV_BACKEND_URL: &str = "COPILOT_BACKEND_URL";
pub const ENV_REQUEST_TIMEOUT: &str = "COPILOT_REQUEST_TIMEOUT_SECS";
pub const DEFAULT_CONFIG_FILE: &str = "copilot.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("Invalid value for {key}: {value}")]
    InvalidEnv { key: String, value: String },
}

/// Main client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CopilotConfig {
    /// Backend base URL, without the `/api/chat` suffix
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    /// Deadline for one chat request (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub tui: TuiConfig,
}

/// Terminal UI configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuiConfig {
    #[serde(default = "default_true")]
    pub show_dashboard: bool,

    #[serde(default = "default_true")]
    pub show_roster: bool,

    /// Input history entries kept for Up/Down recall
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

fn default_backend_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_request_timeout() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

fn default_history_limit() -> usize {
    100
}

impl Default for CopilotConfig {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            request_timeout_secs: default_request_timeout(),
            tui: TuiConfig::default(),
        }
    }
}

impl Default for TuiConfig {
    fn default() -> Self {
        Self {
            show_dashboard: true,
            show_roster: true,
            history_limit: default_history_limit(),
        }
    }
}

impl CopilotConfig {
    /// Parse a YAML config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load from `path` if given, else from `./copilot.yaml` when present,
    /// else defaults; then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let local = Path::new(DEFAULT_CONFIG_FILE);
                if local.is_file() {
                    Self::from_file(local)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env()?;
        debug!(
            backend_url = %config.backend_url,
            timeout_secs = config.request_timeout_secs,
            "config loaded"
        );
        Ok(config)
    }

    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(url) = std::env::var(ENV_BACKEND_URL)
            && !url.trim().is_empty()
        {
            self.backend_url = url.trim().to_string();
        }
        if let Ok(raw) = std::env::var(ENV_REQUEST_TIMEOUT) {
            self.request_timeout_secs =
                raw.trim()
                    .parse::<u64>()
                    .map_err(|_| ConfigError::InvalidEnv {
                        key: ENV_REQUEST_TIMEOUT.to_string(),
                        value: raw.clone(),
                    })?;
        }
        Ok(())
    }

    /// `backend_url` with any trailing slash removed.
    pub fn base_url(&self) -> &str {
        self.backend_url.trim_end_matches('/')
    }

    pub fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url())
    }

    pub fn health_url(&self) -> String {
        format!("{}/health", self.base_url())
    }
}
