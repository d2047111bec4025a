//! Resource commands: patients, doctors, appointments, staff and beds.

use super::{confirm, user_error, Portal};
use crate::output::{self, OutputFormat};
use anyhow::{bail, Context, Result};
use clap::Subcommand;
use portal_auth::{Resource, ResourceApi, UpdateMode};
use serde_json::Value;
use std::io::{self, Read};
use tracing::warn;

#[derive(Debug, Subcommand)]
pub enum ResourceCommands {
    /// List records, optionally filtered
    List {
        /// patients, doctors, appointments, staff or beds
        #[arg(value_parser = parse_resource)]
        resource: Resource,
        /// Query filter as key=value (repeatable)
        #[arg(long = "filter", value_parser = parse_filter)]
        filters: Vec<(String, String)>,
    },
    /// Show a single record
    Get {
        #[arg(value_parser = parse_resource)]
        resource: Resource,
        id: i64,
    },
    /// Create a record from JSON
    Create {
        #[arg(value_parser = parse_resource)]
        resource: Resource,
        /// JSON body, or '-' to read from stdin
        #[arg(short, long)]
        data: String,
    },
    /// Update a record from JSON
    Update {
        #[arg(value_parser = parse_resource)]
        resource: Resource,
        id: i64,
        /// JSON body, or '-' to read from stdin
        #[arg(short, long)]
        data: String,
        /// Patch only the given fields (doctors; other records are replaced whole)
        #[arg(long)]
        partial: bool,
    },
    /// Delete a record
    Delete {
        #[arg(value_parser = parse_resource)]
        resource: Resource,
        id: i64,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Search records by free text
    Search {
        #[arg(value_parser = parse_resource)]
        resource: Resource,
        query: String,
    },
    /// Show aggregate statistics
    Stats {
        #[arg(value_parser = parse_resource)]
        resource: Resource,
    },
    /// Today's appointments
    Today,
    /// Upcoming appointments
    Upcoming,
}

fn parse_resource(raw: &str) -> Result<Resource, String> {
    raw.parse().map_err(|_| {
        let names: Vec<&str> = Resource::ALL.iter().map(|r| r.name()).collect();
        format!("unknown resource '{}' (expected one of: {})", raw, names.join(", "))
    })
}

fn parse_filter(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected key=value, got '{}'", raw)),
    }
}

fn parse_body(raw: &str) -> Result<Value> {
    let text = if raw == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read JSON from stdin")?;
        buf
    } else {
        raw.to_string()
    };

    let value: Value = serde_json::from_str(&text).context("Record data is not valid JSON")?;
    if !value.is_object() {
        bail!("Record data must be a JSON object");
    }
    Ok(value)
}

/// Run a resource command against the signed-in session.
pub async fn resource(portal: &Portal, command: ResourceCommands, format: &OutputFormat) -> Result<()> {
    let Some(identity) = portal.session.identity() else {
        bail!("Not logged in. Run 'hospital-portal login' first");
    };
    if identity.is_expired() {
        warn!(user_id = identity.user_id, "Access token has expired, the server may reject it");
    }

    let api = ResourceApi::new(portal.session.clone());

    let result = match command {
        ResourceCommands::List { resource, filters } => api.list(resource, &filters).await,
        ResourceCommands::Get { resource, id } => api.get(resource, id).await,
        ResourceCommands::Create { resource, data } => {
            api.create(resource, parse_body(&data)?).await
        }
        ResourceCommands::Update {
            resource,
            id,
            data,
            partial,
        } => {
            let mode = if partial {
                UpdateMode::Partial
            } else {
                UpdateMode::Full
            };
            api.update(resource, id, parse_body(&data)?, mode).await
        }
        ResourceCommands::Delete { resource, id, yes } => {
            if !yes && !confirm(&format!("Delete {} {}?", resource, id)) {
                output::print_success("Cancelled", format);
                return Ok(());
            }
            api.delete(resource, id).await
        }
        ResourceCommands::Search { resource, query } => api.search(resource, &query).await,
        ResourceCommands::Stats { resource } => api.stats(resource).await,
        ResourceCommands::Today => api.appointments_today().await,
        ResourceCommands::Upcoming => api.appointments_upcoming().await,
    };

    let value = result.map_err(user_error)?;
    if value.is_null() {
        output::print_success("Done", format);
    } else {
        output::print_value(&value, format);
    }
    Ok(())
}
