//! CLI command implementations.

mod auth;
mod resources;
mod routes;

pub use auth::{login, logout, profile, register, status, LoginArgs, RegisterArgs};
pub use resources::{resource, ResourceCommands};
pub use routes::routes;

use anyhow::{Context, Result};
use portal_auth::{ApiClient, AuthError, SessionContext, View};
use portal_config_and_utils::{Config, Paths};
use portal_storage::create_token_store;
use std::io::{self, Write};
use std::sync::Arc;
use tracing::{debug, info};

/// Everything a command needs: loaded config and the shared session.
pub struct Portal {
    pub config: Config,
    pub session: Arc<SessionContext>,
}

impl Portal {
    /// Wire storage, the request pipeline and the session, then read the stored session.
    pub async fn open(paths: &Paths, config: Config) -> Result<Self> {
        paths.ensure_dirs().context("Failed to create portal directories")?;

        let tokens = create_token_store(&paths.storage_file())
            .with_context(|| format!("Failed to open {}", paths.storage_file().display()))?;
        let client = ApiClient::from_config(&config, Arc::new(tokens))
            .context("Invalid API configuration")?;
        debug!(base_url = %client.base_url(), "API client ready");

        let session = Arc::new(SessionContext::new(client));
        session.set_navigation_callback(Box::new(|view| match view {
            View::Login => info!("Session ended, sign-in required"),
            other => debug!(view = %other, "Navigation requested"),
        }));

        session.initialize();
        session.wait_until_settled().await;

        Ok(Self { config, session })
    }
}

/// Convert an auth failure into the message the user should see.
pub(crate) fn user_error(err: AuthError) -> anyhow::Error {
    if err.is_unauthorized() {
        anyhow::anyhow!(
            "{} (session expired, run 'hospital-portal login')",
            err.user_message()
        )
    } else {
        anyhow::anyhow!(err.user_message())
    }
}

/// Prompt for a line of input, returning it trimmed.
pub(crate) fn prompt(label: &str) -> Result<String> {
    print!("{}: ", label);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

/// Use the given value, or prompt for it when absent.
pub(crate) fn value_or_prompt(value: Option<String>, label: &str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => prompt(label),
    }
}

/// Ask a yes/no question, defaulting to no.
pub(crate) fn confirm(question: &str) -> bool {
    print!("{} [y/N] ", question);
    if io::stdout().flush().is_err() {
        return false;
    }

    let mut input = String::new();
    if io::stdin().read_line(&mut input).is_err() {
        return false;
    }

    matches!(input.trim().to_lowercase().as_str(), "y" | "yes")
}
