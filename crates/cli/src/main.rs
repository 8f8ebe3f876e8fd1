//! stbl-mcp CLI — the main entry point.
//!
//! Commands:
//! - `serve`   — Run the tool server over stdio (the default)
//! - `onboard` — Initialize config and local storage
//! - `status`  — Show config, storage, and onboarding status
//! - `export`  — Dump all local records as JSON
//! - `cleanup` — Drop stale transactions and inactive addresses

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "stbl-mcp",
    about = "Stability blockchain tool server with live event subscriptions",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the tool server over stdio
    Serve,

    /// Initialize configuration and local storage
    Onboard,

    /// Show config, storage, and onboarding status
    Status,

    /// Dump all local records as JSON
    Export,

    /// Drop stale transactions and inactive addresses
    Cleanup {
        /// Remove records older than this many days
        #[arg(long, default_value_t = 30)]
        older_than_days: i64,

        /// Keep at most this many of the newest transactions
        #[arg(long, default_value_t = 100)]
        keep_transactions: usize,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // stdout carries the serve protocol, so logs go to stderr
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => commands::serve::run().await?,
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Status => commands::status::run().await?,
        Commands::Export => commands::export::run().await?,
        Commands::Cleanup {
            older_than_days,
            keep_transactions,
        } => commands::cleanup::run(older_than_days, keep_transactions).await?,
    }

    Ok(())
}
