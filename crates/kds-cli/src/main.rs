//! KDS CLI - command-line interface for the kitchen order service.
//!
//! The main entry point for the `kds` CLI binary.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kds_cli::{Cli, Commands};

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();
    let config = cli.config();

    // Create runtime and execute
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        match cli.command {
            Commands::Watch(args) => kds_cli::commands::watch::execute(args, &config).await,
            Commands::Orders(args) => kds_cli::commands::orders::execute(args, &config).await,
            Commands::Advance(args) => kds_cli::commands::advance::execute(args, &config).await,
        }
    })
}
