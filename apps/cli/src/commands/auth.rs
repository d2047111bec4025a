//! Authentication commands.

use super::{user_error, value_or_prompt, Portal};
use crate::output::{self, OutputFormat};
use anyhow::{bail, Result};
use clap::Args;
use portal_auth::{Credentials, RegistrationForm, Role, SessionState};
use serde_json::json;
use tracing::debug;

#[derive(Debug, Args)]
pub struct LoginArgs {
    /// Username (prompted when omitted)
    #[arg(short, long)]
    pub username: Option<String>,

    /// Hospital ID (prompted when omitted)
    #[arg(long, env = "HOSPITAL_PORTAL_HOSPITAL_ID")]
    pub hospital: Option<String>,
}

#[derive(Debug, Args)]
pub struct RegisterArgs {
    #[arg(short, long)]
    pub username: Option<String>,

    #[arg(long)]
    pub email: Option<String>,

    #[arg(long)]
    pub first_name: Option<String>,

    #[arg(long)]
    pub last_name: Option<String>,

    #[arg(long)]
    pub phone: Option<String>,

    /// Hospital ID
    #[arg(long, env = "HOSPITAL_PORTAL_HOSPITAL_ID")]
    pub hospital: Option<String>,

    /// Staff role (admin, doctor, nurse, receptionist, staff)
    #[arg(long, default_value = "staff")]
    pub role: Role,
}

/// Sign in with username, password and hospital ID.
pub async fn login(portal: &Portal, args: LoginArgs, format: &OutputFormat) -> Result<()> {
    if let Some(identity) = portal.session.identity() {
        let who = identity
            .username
            .clone()
            .unwrap_or_else(|| format!("user {}", identity.user_id));
        output::print_success(&format!("Already logged in as {}", who), format);
        return Ok(());
    }

    let username = value_or_prompt(args.username, "Username")?;
    if username.is_empty() {
        bail!("Username is required");
    }

    let hospital_id = value_or_prompt(args.hospital, "Hospital ID")?;
    if hospital_id.is_empty() {
        bail!("Hospital ID is required");
    }

    // Prompt for password (hidden)
    let password = rpassword::prompt_password("Password: ")?;
    if password.is_empty() {
        bail!("Password is required");
    }

    if *format == OutputFormat::Text {
        println!("Logging in...");
    }

    let credentials = Credentials::new(username, password, hospital_id);
    let identity = portal.session.login(&credentials).await.map_err(user_error)?;

    let role = identity.role.map(|r| r.as_str()).unwrap_or("unknown");
    match format {
        OutputFormat::Text => println!("Logged in as user {} ({})", identity.user_id, role),
        OutputFormat::Json => output::print_json(&json!({
            "status": "success",
            "identity": identity,
        })),
    }
    Ok(())
}

/// Sign out and clear the stored session.
pub async fn logout(portal: &Portal, format: &OutputFormat) -> Result<()> {
    let signed_in = portal.session.snapshot().state.is_authenticated();
    if !signed_in && portal.session.tokens().bearer_token().is_none() {
        output::print_success("Not logged in", format);
        return Ok(());
    }

    if portal.config.revoke_on_logout {
        portal.session.logout_and_revoke().await;
    } else {
        debug!("Skipping server-side revocation");
        portal.session.logout();
    }

    output::print_success("Logged out successfully", format);
    Ok(())
}

/// Show the current session.
pub async fn status(portal: &Portal, format: &OutputFormat) -> Result<()> {
    let snapshot = portal.session.snapshot();

    if *format == OutputFormat::Json {
        output::print_json(&snapshot);
        return Ok(());
    }

    println!("API:      {}", portal.session.client().base_url());
    match &snapshot.state {
        SessionState::Authenticated(identity) => {
            println!("Auth:     logged in");
            println!("User ID:  {}", identity.user_id);
            if let Some(username) = &identity.username {
                println!("Username: {}", username);
            }
            println!(
                "Role:     {}",
                identity.role.map(|r| r.as_str()).unwrap_or("unknown")
            );
            println!(
                "Hospital: {}",
                identity
                    .hospital_id
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "unknown".to_string())
            );
            match identity.expires_at {
                Some(expires_at) if identity.is_expired() => {
                    println!("Expires:  {} (expired)", expires_at.to_rfc3339())
                }
                Some(expires_at) => println!("Expires:  {}", expires_at.to_rfc3339()),
                None => println!("Expires:  unknown"),
            }
        }
        other => println!("Auth:     {}", other.name()),
    }
    Ok(())
}

/// Fetch the signed-in user's profile from the server.
pub async fn profile(portal: &Portal, format: &OutputFormat) -> Result<()> {
    let profile = portal.session.profile().await.map_err(user_error)?;
    output::print_value(&profile, format);
    Ok(())
}

/// Create a staff account. Does not sign in.
pub async fn register(portal: &Portal, args: RegisterArgs, format: &OutputFormat) -> Result<()> {
    let username = value_or_prompt(args.username, "Username")?;
    let email = value_or_prompt(args.email, "Email")?;
    let first_name = value_or_prompt(args.first_name, "First name")?;
    let last_name = value_or_prompt(args.last_name, "Last name")?;
    let phone = value_or_prompt(args.phone, "Phone")?;
    let hospital_id = value_or_prompt(args.hospital, "Hospital ID")?;

    if username.is_empty() || hospital_id.is_empty() {
        bail!("Username and hospital ID are required");
    }

    let password = rpassword::prompt_password("Password: ")?;
    let password2 = rpassword::prompt_password("Confirm password: ")?;

    let form = RegistrationForm {
        username,
        password,
        password2,
        email,
        first_name,
        last_name,
        phone,
        hospital_id,
        role: args.role,
    };

    let created = portal.session.register(&form).await.map_err(user_error)?;

    match format {
        OutputFormat::Text => {
            println!("Account created for {}.", form.username);
            println!("Sign in with 'hospital-portal login'.");
        }
        OutputFormat::Json => output::print_json(&created),
    }
    Ok(())
}
