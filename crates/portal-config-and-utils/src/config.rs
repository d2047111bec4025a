//! Configuration management for the portal client.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Default API base URL (can be overridden at compile time via HOSPITAL_PORTAL_API_URL).
pub const DEFAULT_API_BASE_URL: &str = match option_env!("HOSPITAL_PORTAL_API_URL") {
    Some(url) => url,
    None => "http://localhost:8000/api",
};

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

const ENV_API_URL: &str = "HOSPITAL_PORTAL_API_URL";
const ENV_LOG_LEVEL: &str = "HOSPITAL_PORTAL_LOG_LEVEL";
const ENV_REQUEST_TIMEOUT: &str = "HOSPITAL_PORTAL_REQUEST_TIMEOUT_SECS";

/// Main portal client configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Base URL of the hospital REST API, including the `/api` prefix.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Optional per-request timeout in seconds. `None` means requests may
    /// wait indefinitely.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    /// Revoke the refresh token server-side when logging out.
    #[serde(default = "default_revoke_on_logout")]
    pub revoke_on_logout: bool,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_revoke_on_logout() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            api_base_url: default_api_base_url(),
            request_timeout_secs: None,
            revoke_on_logout: default_revoke_on_logout(),
        }
    }
}

impl Config {
    /// Load configuration from the config file, falling back to defaults,
    /// then apply environment overrides.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    fn load_from_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from a key lookup (the process environment in production).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(url) = non_empty(ENV_API_URL) {
            self.api_base_url = url.trim().to_string();
        }
        if let Some(level) = non_empty(ENV_LOG_LEVEL) {
            self.log_level = level.trim().to_string();
        }
        if let Some(timeout) = non_empty(ENV_REQUEST_TIMEOUT) {
            match timeout.trim().parse::<u64>() {
                Ok(secs) => self.request_timeout_secs = Some(secs),
                Err(_) => tracing::warn!(value = %timeout, "Ignoring invalid request timeout override"),
            }
        }
    }

    /// Check that the configuration is usable.
    pub fn validate(&self) -> CoreResult<()> {
        let url = self.api_base_url()?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(CoreError::Config(format!(
                "API base URL must use http or https, got {}",
                url.scheme()
            )));
        }
        if self.request_timeout_secs == Some(0) {
            return Err(CoreError::Config(
                "request timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Get the API base URL as a parsed URL.
    pub fn api_base_url(&self) -> CoreResult<Url> {
        Url::parse(&self.api_base_url).map_err(CoreError::from)
    }

    /// Request timeout as a duration, if configured.
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}
