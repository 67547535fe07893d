use crate::answer::AnswerKind;
use crate::errors::{AskError, AskResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const APP_NAME: &str = "ask-anything";
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:3000";
pub const DEFAULT_ENDPOINT_PATH: &str = "/api/ask";

/// Environment variable overriding `base_url`
pub const BASE_URL_ENV: &str = "ASK_BASE_URL";

/// Configuration for the Answer Service client and the terminal front-end
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AskConfig {
    pub base_url: Option<String>,
    pub endpoint_path: Option<String>,
    pub answer_kind: Option<AnswerKind>,
    /// Unset means the request waits on the transport's own limits
    pub timeout_secs: Option<u64>,
    pub log_level: Option<String>,
}

impl Default for AskConfig {
    fn default() -> Self {
        Self {
            base_url: Some(DEFAULT_BASE_URL.to_string()),
            endpoint_path: Some(DEFAULT_ENDPOINT_PATH.to_string()),
            answer_kind: Some(AnswerKind::Generic),
            timeout_secs: None,
            log_level: Some("info".to_string()),
        }
    }
}

impl AskConfig {
    /// A config with every field unset, the starting point for override layers
    pub fn empty() -> Self {
        Self {
            base_url: None,
            endpoint_path: None,
            answer_kind: None,
            timeout_secs: None,
            log_level: None,
        }
    }

    /// Loads configuration from a file if it exists, otherwise returns the default config
    pub fn load_from_file(path: &Path) -> AskResult<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)
                .map_err(|e| AskError::Config(format!("Failed to read config file: {}", e)))?;

            let config: Self = toml::from_str(&content)
                .map_err(|e| AskError::Config(format!("Failed to parse config file: {}", e)))?;

            // Fields absent from the file keep their defaults
            Ok(Self::default().merge(&config))
        } else {
            Ok(Self::default())
        }
    }

    /// Saves configuration to a file
    pub fn save_to_file(&self, path: &Path) -> AskResult<()> {
        let content = toml::to_string(self)
            .map_err(|e| AskError::Config(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                AskError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        fs::write(path, content)
            .map_err(|e| AskError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Merges this config with another config, preferring values from the other config if present
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            base_url: other.base_url.clone().or_else(|| self.base_url.clone()),
            endpoint_path: other
                .endpoint_path
                .clone()
                .or_else(|| self.endpoint_path.clone()),
            answer_kind: other.answer_kind.or(self.answer_kind),
            timeout_secs: other.timeout_secs.or(self.timeout_secs),
            log_level: other.log_level.clone().or_else(|| self.log_level.clone()),
        }
    }

    /// Applies overrides from the process environment
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary variable lookup
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(BASE_URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.base_url = Some(url);
        }
        self
    }

    /// Full URL of the ask endpoint
    pub fn endpoint_url(&self) -> String {
        let base = self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        let path = self.endpoint_path.as_deref().unwrap_or(DEFAULT_ENDPOINT_PATH);
        format!(
            "{}/{}",
            base.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub fn answer_kind(&self) -> AnswerKind {
        self.answer_kind.unwrap_or_default()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Helper function to get default config directory
pub fn get_default_config_dir() -> AskResult<PathBuf> {
    let home_dir = dirs::home_dir()
        .ok_or_else(|| AskError::Config("Could not determine home directory".to_string()))?;

    Ok(home_dir.join(".config").join(APP_NAME))
}

/// Helper function to get default config file path
pub fn get_default_config_file() -> AskResult<PathBuf> {
    Ok(get_default_config_dir()?.join("config.toml"))
}
