//! TrendSpotter CLI — the main entry point.
//!
//! Commands:
//! - `onboard` — Initialize config
//! - `report`  — Diagnose a sales CSV and emit the report page
//! - `models`  — List the models this credential can use
//! - `doctor`  — Diagnose setup health

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "trendspotter",
    about = "TrendSpotter — strict-context sales diagnosis reports",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration
    Onboard,

    /// Diagnose a sales CSV and emit the report page description
    Report {
        /// Path to the input CSV
        #[arg(short, long)]
        input: PathBuf,

        /// Write the page description JSON here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// List the models this credential can use, with their tiers
    Models,

    /// Diagnose setup health
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Report { input, out } => commands::report::run(input, out).await?,
        Commands::Models => commands::models::run().await?,
        Commands::Doctor => commands::doctor::run().await?,
    }

    Ok(())
}
