//! SchemaFlow Dry Run - command line front end
//!
//! Connects to the target database, loads SQL migrations from a glob and
//! prints the statements `up` or `down` would run. Nothing is written.

mod cli;

use crate::cli::{Cli, Commands};
use clap::Parser;
use schemaflow_dryrun::config::Settings;
use schemaflow_dryrun::db::{check_connection, create_pool};
use schemaflow_dryrun::{Database, Direction, DryRun, DryRunReport, RunOptions};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(path) = cli.migrations.clone() {
        settings.dry_run.migrations_path = path;
    }
    if let Some(table) = cli.tracking_table.clone() {
        settings.dry_run.tracking_table = table;
    }
    if let Some(quote) = cli.tracking_quote {
        settings.dry_run.tracking_quote = quote;
    }
    settings.dry_run.verbose |= cli.verbose;
    info!("📋 Configuration loaded (migrations: {})", settings.dry_run.migrations_path);

    let pool = create_pool(&settings.database)?;
    check_connection(&pool).await?;
    info!("✅ Connected to {}", settings.database.database);

    let json = cli.json;
    let dry_run = DryRun::from_config(Database::postgres(pool), &settings.dry_run)
        .logger(move |rendered| {
            if !json {
                println!("{}", rendered);
            }
        })
        .build()?;

    let (direction, results) = match cli.command {
        Commands::Up => (Direction::Up, dry_run.up(RunOptions::new()).await?),
        Commands::Down => (
            Direction::Down,
            dry_run.down(RunOptions::new()).await?.into_iter().collect(),
        ),
    };

    if json {
        let report = DryRunReport::new(direction, results);
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if results.is_empty() {
        println!("Nothing to {}.", direction);
    }

    info!("👋 Dry run complete, database untouched");
    Ok(())
}

/// Initialize tracing with structured logging
fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "info,schemaflow_dryrun=debug"
    } else {
        "warn,schemaflow_dryrun=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();
}
