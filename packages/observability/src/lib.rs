//! Logging setup shared by every hospital portal binary.
//!
//! Library crates only emit `tracing` events. A binary calls
//! [`init_with_config`] once at startup to decide where they go:
//!
//! - default build: compact lines on stderr
//! - `dev` feature: JSONL appended to one file shared by all portal
//!   processes, `~/.hospital-portal/logs/dev.jsonl` unless configured
//!
//! ```rust,ignore
//! observability::init_with_config(
//!     observability::LogConfig::for_service("portal-cli").with_level("debug"),
//! );
//! tracing::info!("ready");
//! ```

#[cfg(feature = "dev")]
mod dev;

#[cfg_attr(not(feature = "dev"), allow(dead_code))]
mod json_layer;

use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Where and how much to log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Written on every JSONL line so processes sharing the file can be told apart.
    pub service_name: String,
    /// Filter directive used when `RUST_LOG` is unset.
    pub default_level: String,
    /// Dev log file. `None` means the default location.
    pub log_path: Option<PathBuf>,
    /// In dev builds, mirror warnings and errors to stderr as well.
    pub also_stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::for_service("hospital-portal")
    }
}

impl LogConfig {
    pub fn for_service(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            default_level: "info".into(),
            log_path: None,
            also_stderr: false,
        }
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.default_level = level.into();
        self
    }

    pub fn with_log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(path.into());
        self
    }

    /// Dev log file this config writes to.
    pub fn resolved_log_path(&self) -> PathBuf {
        self.log_path.clone().unwrap_or_else(default_log_path)
    }

    /// `RUST_LOG` if set and valid, otherwise the configured default.
    pub(crate) fn env_filter(&self) -> EnvFilter {
        filter_or(&self.default_level)
    }
}

pub(crate) fn filter_or(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

fn default_log_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".hospital-portal")
        .join("logs")
        .join("dev.jsonl")
}

/// Install the process-wide subscriber.
///
/// Only the first call in a process takes effect.
pub fn init_with_config(config: LogConfig) {
    #[cfg(feature = "dev")]
    {
        dev::init_dev_subscriber(&config);
    }

    #[cfg(not(feature = "dev"))]
    {
        init_stderr(&config);
    }
}

/// Install a compact stderr subscriber.
pub(crate) fn init_stderr(config: &LogConfig) {
    use tracing_subscriber::util::SubscriberInitExt;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(config.env_filter())
        .with_writer(std::io::stderr)
        .with_target(true)
        .compact()
        .finish()
        .try_init();
}

/// Shorthand for [`init_with_config`] with defaults for `service_name`.
pub fn init(service_name: &str) {
    init_with_config(LogConfig::for_service(service_name));
}
