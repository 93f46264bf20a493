use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{error, info};

mod cli;

use cli::runtime::init_logging;
use cli::serve::{cmd_check_config, cmd_serve, ServeArgs};

/// Relationship-based access control gateway for projects
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (defaults to logging.level from configuration)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Enable debug mode
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve(ServeArgs),

    /// Print the resolved configuration with secrets masked
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = rebac_gateway::load_settings(cli.config.as_deref())?;
    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| settings.logging.level.clone());
    init_logging(&level, cli.debug)?;

    info!("Starting rebac-gateway v{}", env!("CARGO_PKG_VERSION"));

    let result = match cli.command {
        Commands::Serve(args) => cmd_serve(args, settings).await,
        Commands::CheckConfig => cmd_check_config(&settings),
    };

    if let Err(err) = &result {
        error!("Command failed: {:#}", err);
    }
    result
}
