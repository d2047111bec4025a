//! Hospital portal CLI - sign in and work with the hospital API from a terminal.

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{LoginArgs, Portal, RegisterArgs, ResourceCommands};
use portal_config_and_utils::{init_logging, Config, Paths};
use tracing::debug;

/// Hospital portal CLI - manage your session and hospital records.
#[derive(Parser)]
#[command(name = "hospital-portal")]
#[command(about = "Hospital portal CLI for authentication and record management")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(short, long, default_value = "text", global = true)]
    format: output::OutputFormat,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// API base URL; overrides the config file and environment
    #[arg(long, global = true)]
    api_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Login with username, password and hospital ID
    Login(LoginArgs),

    /// Logout and clear session
    Logout,

    /// Create a staff account
    Register(RegisterArgs),

    /// Check authentication status
    Status,

    /// Show the signed-in user's profile
    #[command(visible_alias = "whoami")]
    Profile,

    /// Show which portal views the current session can open
    Routes {
        /// Check a single path instead of every view
        path: Option<String>,
    },

    /// Work with hospital records
    #[command(visible_alias = "r")]
    Resource {
        #[command(subcommand)]
        command: ResourceCommands,
    },
}

fn load_config(cli: &Cli, paths: &Paths) -> Result<Config> {
    let mut config = Config::load(paths)?;
    if let Some(url) = &cli.api_url {
        config.api_base_url = url.trim().to_string();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    config.validate()?;
    Ok(config)
}

async fn run(cli: Cli) -> Result<()> {
    let paths = Paths::new()?;
    let config = load_config(&cli, &paths)?;

    init_logging(&config.log_level, &paths);
    debug!(api = %config.api_base_url, "Configuration loaded");

    let portal = Portal::open(&paths, config).await?;
    let format = &cli.format;

    match cli.command {
        Commands::Login(args) => commands::login(&portal, args, format).await,
        Commands::Logout => commands::logout(&portal, format).await,
        Commands::Register(args) => commands::register(&portal, args, format).await,
        Commands::Status => commands::status(&portal, format).await,
        Commands::Profile => commands::profile(&portal, format).await,
        Commands::Routes { path } => commands::routes(&portal, path.as_deref(), format).await,
        Commands::Resource { command } => commands::resource(&portal, command, format).await,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let format = cli.format;

    if let Err(e) = run(cli).await {
        output::print_error(&format!("{:#}", e), &format);
        std::process::exit(1);
    }
}
