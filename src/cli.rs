//! CLI argument definitions using clap derive API

use clap::{Parser, Subcommand};
use schemaflow_dryrun::QuoteStyle;
use std::path::PathBuf;

/// Show the SQL pending migrations would run, without running it
#[derive(Parser, Debug)]
#[command(name = "schemaflow-dryrun")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Log every captured and pass-through statement
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Dry-run settings file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Glob matching SQL migration files
    #[arg(short, long, global = true)]
    pub migrations: Option<String>,

    /// Tracking table name
    #[arg(short, long, global = true)]
    pub tracking_table: Option<String>,

    /// Quoting for the synthetic tracking statements (backtick | double)
    #[arg(long, global = true)]
    pub tracking_quote: Option<QuoteStyle>,

    /// Print a JSON report instead of transcripts
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Simulate all pending migrations
    Up,
    /// Simulate reverting the most recently executed migration
    Down,
}
