//! Output formatting for the CLI.

use clap::ValueEnum;
use serde::Serialize;
use serde_json::{json, Value};

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Print a serializable value as pretty JSON.
pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error: failed to encode output: {}", e),
    }
}

/// Print a success message.
pub fn print_success(message: &str, format: &OutputFormat) {
    match format {
        OutputFormat::Text => println!("{}", message),
        OutputFormat::Json => print_json(&json!({"status": "success", "message": message})),
    }
}

/// Print an error message.
pub fn print_error(message: &str, format: &OutputFormat) {
    match format {
        OutputFormat::Text => eprintln!("Error: {}", message),
        OutputFormat::Json => {
            let line = json!({"status": "error", "message": message});
            eprintln!("{}", line);
        }
    }
}

/// Print a backend record or collection.
///
/// Objects render as labelled rows in text mode; lists render one record
/// per line. JSON mode passes the value through unchanged.
pub fn print_value(value: &Value, format: &OutputFormat) {
    if *format == OutputFormat::Json {
        print_json(value);
        return;
    }

    match value {
        Value::Object(map) => {
            for (key, field) in map {
                print_row(key, &render_scalar(field));
            }
        }
        Value::Array(items) if items.is_empty() => println!("(no records)"),
        Value::Array(items) => {
            for item in items {
                println!("{}", item);
            }
            print_divider();
            println!("{} record(s)", items.len());
        }
        other => println!("{}", render_scalar(other)),
    }
}

fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}

/// Print a table row.
pub fn print_row(label: &str, value: &str) {
    println!("  {:<16} {}", format!("{}:", label), value);
}

/// Print a divider line.
pub fn print_divider() {
    println!("{}", "-".repeat(50));
}

/// Print a heading.
pub fn print_heading(text: &str) {
    println!("\n{}", text);
    print_divider();
}
