//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Recon - Pair up records across two ledgers
#[derive(Parser)]
#[command(name = "recon")]
#[command(about = "Transaction ledger reconciliation", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to the data-dir override, then built-in defaults)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Reconcile a left and a right record source (.csv or .json)
    Reconcile {
        /// Exactly two record sources: LEFT RIGHT
        #[arg(required = true)]
        sources: Vec<PathBuf>,

        /// Rules file (TOML) with matching rules, extraction rules and profile
        #[arg(short, long)]
        rules: Option<PathBuf>,

        /// Matching mode: auto (provider with local fallback), heuristic, deterministic
        #[arg(short, long, default_value = "auto")]
        mode: String,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,

        /// Also write the JSON report to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the columns the extraction rules expect
    Terms {
        /// Rules file (TOML)
        #[arg(short, long)]
        rules: PathBuf,
    },

    /// Remote provider commands
    Provider {
        #[command(subcommand)]
        action: ProviderAction,
    },
}

#[derive(Subcommand)]
pub enum ProviderAction {
    /// Check that the configured provider is reachable
    Check,
}
