//! punocracy - operator command line for the curation core
//!
//! Resolves configuration and the database path, initializes logging, opens
//! (creating if needed) the database, then runs one subcommand.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use punocracy_common::config::{load_toml_config, resolve_database_path};
use punocracy_common::db::init::init_database;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::Command;

/// Command-line arguments for punocracy
#[derive(Parser, Debug)]
#[command(name = "punocracy")]
#[command(about = "Phrase curation and ratings for Punocracy")]
#[command(version)]
struct Cli {
    /// SQLite database file (overrides PUNOCRACY_DATABASE and the config file)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Configuration file (defaults to the per-user or system config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_toml_config(cli.config.as_deref()).context("Failed to load configuration")?;

    // Logs go to stderr so --json output stays machine readable
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Starting punocracy v{}", env!("CARGO_PKG_VERSION"));

    let db_path = resolve_database_path(cli.database.as_deref(), &config);
    debug!("Database path: {}", db_path.display());

    let pool = init_database(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    let result = commands::run(cli.command, &pool, &config, cli.json).await;
    pool.close().await;
    result
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);

            // Store failures are distinguished from rejected input
            let store_failure = e
                .chain()
                .filter_map(|cause| cause.downcast_ref::<punocracy_common::Error>())
                .any(|cause| cause.is_store_error());
            if store_failure {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}
