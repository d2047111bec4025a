//! Errors raised while locating or loading the portal's local files.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration is present but unusable
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid API URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Config file is not valid JSON
    #[error("Malformed config file: {0}")]
    Json(#[from] serde_json::Error),

    /// Neither `HOSPITAL_PORTAL_HOME` nor a home directory is available
    #[error("Cannot locate the portal directory: no home directory and HOSPITAL_PORTAL_HOME is unset")]
    NoHomeDir,
}

pub type CoreResult<T> = Result<T, CoreError>;
