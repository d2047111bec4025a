//! Logging setup for portal binaries.
//!
//! Delegates to the observability package. The level comes from `RUST_LOG`
//! when set, otherwise from the configured level. Dev builds write JSONL to
//! the portal's log directory.

use crate::Paths;

const ENV_LOG_STDERR: &str = "HOSPITAL_PORTAL_LOG_STDERR";

/// Initialize logging for the portal CLI.
pub fn init_logging(level: &str, paths: &Paths) {
    init_logging_for_service("portal-cli", level, paths);
}

/// Initialize logging under a custom service name.
pub fn init_logging_for_service(service_name: &str, level: &str, paths: &Paths) {
    let mut config = observability::LogConfig::for_service(service_name)
        .with_level(parse_level(level).as_str().to_ascii_lowercase())
        .with_log_path(paths.dev_log_file());
    config.also_stderr = is_truthy(std::env::var(ENV_LOG_STDERR).ok().as_deref());

    observability::init_with_config(config);
}

fn is_truthy(raw: Option<&str>) -> bool {
    raw.map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

/// Map a configured level name to a tracing level. Unknown names mean info.
pub fn parse_level(level: &str) -> tracing::Level {
    level
        .trim()
        .parse::<tracing::Level>()
        .ok()
        .or_else(|| level.trim().eq_ignore_ascii_case("warning").then_some(tracing::Level::WARN))
        .unwrap_or(tracing::Level::INFO)
}
