//! Recon CLI - Transaction ledger reconciliation
//!
//! Usage:
//!   recon reconcile LEFT RIGHT --rules rules.toml   Reconcile two record sources
//!   recon terms --rules rules.toml                  Show extraction columns
//!   recon provider check                            Check the remote provider

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Reconcile {
            sources,
            rules,
            mode,
            json,
            output,
        } => {
            commands::cmd_reconcile(
                &sources,
                rules.as_deref(),
                &mode,
                cli.config.as_deref(),
                json,
                output.as_deref(),
            )
            .await
        }
        Commands::Terms { rules } => commands::cmd_terms(&rules),
        Commands::Provider { action } => match action {
            ProviderAction::Check => commands::cmd_provider_check(cli.config.as_deref()).await,
        },
    }
}
