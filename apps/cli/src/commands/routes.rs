//! Route access checks against the current session.

use super::Portal;
use crate::output::{self, OutputFormat};
use anyhow::Result;
use portal_auth::{resolve, RouteOutcome, SessionSnapshot, View};
use serde_json::{json, Value};

fn describe(outcome: RouteOutcome) -> String {
    match outcome {
        RouteOutcome::Render(view) => format!("allowed ({})", view),
        RouteOutcome::Redirect(target) => format!("redirect to {}", target),
        RouteOutcome::Pending => "pending".to_string(),
        RouteOutcome::NotFound => "not found".to_string(),
    }
}

fn outcome_json(path: &str, outcome: RouteOutcome) -> Value {
    match outcome {
        RouteOutcome::Render(view) => json!({"path": path, "outcome": "render", "view": view}),
        RouteOutcome::Redirect(target) => {
            json!({"path": path, "outcome": "redirect", "target": target.path()})
        }
        RouteOutcome::Pending => json!({"path": path, "outcome": "pending"}),
        RouteOutcome::NotFound => json!({"path": path, "outcome": "not_found"}),
    }
}

fn resolve_paths<'a>(paths: &[&'a str], snapshot: &SessionSnapshot) -> Vec<(&'a str, RouteOutcome)> {
    paths.iter().map(|path| (*path, resolve(path, snapshot))).collect()
}

/// Show what navigating to `path` (or every view) would do right now.
pub async fn routes(portal: &Portal, path: Option<&str>, format: &OutputFormat) -> Result<()> {
    let snapshot = portal.session.snapshot();
    let paths: Vec<&str> = match path {
        Some(p) => vec![p],
        None => View::ALL.iter().map(|v| v.path()).collect(),
    };
    let results = resolve_paths(&paths, &snapshot);

    match format {
        OutputFormat::Text => {
            output::print_heading(&format!("Routes ({})", snapshot.state.name()));
            for (path, outcome) in &results {
                output::print_row(path, &describe(*outcome));
            }
        }
        OutputFormat::Json => {
            let items: Vec<Value> = results
                .iter()
                .map(|(path, outcome)| outcome_json(path, *outcome))
                .collect();
            output::print_json(&items);
        }
    }
    Ok(())
}
