//! Dry run orchestrator
//!
//! Runs pending (or the latest executed) migrations against an intercepted
//! environment and reports, per migration, the statements that would have
//! been executed.

use super::intercept::Interception;
use super::tracking::{QuoteStyle, TrackingStatements};
use super::transcript;
use crate::config::DryRunConfig;
use crate::db::Database;
use crate::error::{config_error, AppResult};
use crate::migration::{Direction, MigrationRegistry, MigrationStorage};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Default name of the tracking table
pub const DEFAULT_TRACKING_TABLE: &str = "SequelizeMeta";

/// Receives each rendered transcript block
pub type TranscriptSink = Arc<dyn Fn(&str) + Send + Sync>;

type MigrationCallback = Box<dyn Fn(&str, &[String]) + Send + Sync>;

/// Outcome for one migration
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationResult {
    pub name: String,
    pub direction: Direction,
    pub statements: Vec<String>,
    pub rendered_output: String,
}

impl MigrationResult {
    fn new(name: String, direction: Direction, statements: Vec<String>) -> Self {
        let rendered_output = transcript::format(&name, direction, &statements);
        Self {
            name,
            direction,
            statements,
            rendered_output,
        }
    }
}

/// Serializable summary of one invocation
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DryRunReport {
    pub direction: Direction,
    pub generated_at: DateTime<Utc>,
    pub migrations: Vec<MigrationResult>,
}

impl DryRunReport {
    pub fn new(direction: Direction, migrations: Vec<MigrationResult>) -> Self {
        Self {
            direction,
            generated_at: Utc::now(),
            migrations,
        }
    }
}

/// Per-invocation options
#[derive(Default)]
pub struct RunOptions {
    on_migration: Option<MigrationCallback>,
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called with each migration's name and captured statements
    pub fn on_migration<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str, &[String]) + Send + Sync + 'static,
    {
        self.on_migration = Some(Box::new(callback));
        self
    }

    fn notify(&self, result: &MigrationResult) {
        if let Some(ref callback) = self.on_migration {
            callback(&result.name, &result.statements);
        }
    }
}

enum MigrationSource {
    Registry(Arc<MigrationRegistry>),
    Glob(String),
}

impl MigrationSource {
    fn load(&self) -> AppResult<Arc<MigrationRegistry>> {
        match self {
            MigrationSource::Registry(registry) => Ok(registry.clone()),
            MigrationSource::Glob(pattern) => Ok(Arc::new(MigrationRegistry::from_glob(pattern)?)),
        }
    }
}

/// Builder for [`DryRun`]
#[derive(Default)]
pub struct DryRunBuilder {
    database: Option<Database>,
    source: Option<MigrationSource>,
    storage: Option<Arc<dyn MigrationStorage>>,
    tracking_table: Option<String>,
    tracking_quote: QuoteStyle,
    verbose: bool,
    logger: Option<TranscriptSink>,
}

impl DryRunBuilder {
    pub fn database(mut self, database: Database) -> Self {
        self.database = Some(database);
        self
    }

    /// Use an explicit registry
    pub fn migrations(mut self, registry: MigrationRegistry) -> Self {
        self.source = Some(MigrationSource::Registry(Arc::new(registry)));
        self
    }

    /// Load SQL migrations matching a glob at the start of each run
    pub fn migrations_path(mut self, pattern: impl Into<String>) -> Self {
        self.source = Some(MigrationSource::Glob(pattern.into()));
        self
    }

    /// Read executed migrations from this storage instead of the tracking table
    pub fn storage(mut self, storage: Arc<dyn MigrationStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn tracking_table(mut self, table: impl Into<String>) -> Self {
        self.tracking_table = Some(table.into());
        self
    }

    pub fn tracking_quote(mut self, quote: QuoteStyle) -> Self {
        self.tracking_quote = quote;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn logger<F>(mut self, sink: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.logger = Some(Arc::new(sink));
        self
    }

    pub fn build(self) -> AppResult<DryRun> {
        let database = self
            .database
            .ok_or_else(|| config_error("A database handle is required"))?;
        let source = self
            .source
            .ok_or_else(|| config_error("A migrations registry or path is required"))?;

        let tracking_table = self
            .tracking_table
            .unwrap_or_else(|| DEFAULT_TRACKING_TABLE.to_string());
        if tracking_table.trim().is_empty() {
            return Err(config_error("Tracking table name must not be empty"));
        }

        let logger: TranscriptSink = match self.logger {
            Some(logger) => logger,
            None => Arc::new(|rendered: &str| info!("\n{}", rendered)),
        };

        Ok(DryRun {
            tracking: TrackingStatements::new(&tracking_table, self.tracking_quote),
            database,
            source,
            storage: self.storage,
            tracking_table,
            verbose: self.verbose,
            logger,
        })
    }
}

/// Dry-run entry point
pub struct DryRun {
    database: Database,
    source: MigrationSource,
    storage: Option<Arc<dyn MigrationStorage>>,
    tracking_table: String,
    tracking: TrackingStatements,
    verbose: bool,
    logger: TranscriptSink,
}

impl DryRun {
    pub fn builder() -> DryRunBuilder {
        DryRunBuilder::default()
    }

    /// Builder preloaded from settings
    pub fn from_config(database: Database, config: &DryRunConfig) -> DryRunBuilder {
        Self::builder()
            .database(database)
            .migrations_path(config.migrations_path.clone())
            .tracking_table(config.tracking_table.clone())
            .tracking_quote(config.tracking_quote)
            .verbose(config.verbose)
    }

    pub fn tracking_table(&self) -> &str {
        &self.tracking_table
    }

    fn install(&self) -> AppResult<Interception> {
        let registry = self.source.load()?;
        Ok(Interception::install(
            &self.database,
            registry,
            self.storage.clone(),
            &self.tracking_table,
            self.verbose,
        ))
    }

    fn finish(&self, result: &MigrationResult, options: &RunOptions) {
        (self.logger)(&result.rendered_output);
        options.notify(result);
    }

    /// Simulate every pending migration, in runner order
    pub async fn up(&self, options: RunOptions) -> AppResult<Vec<MigrationResult>> {
        let interception = self.install()?;
        let runner = interception.runner();

        let pending = runner.pending().await?;
        if pending.is_empty() {
            info!("No pending migrations");
            return Ok(Vec::new());
        }
        info!("Simulating {} pending migration(s)", pending.len());

        let mut results = Vec::with_capacity(pending.len());
        for descriptor in pending {
            let start = interception.buffer().len().await;

            let migration = runner.resolve(&descriptor.name)?;
            migration.up(interception.queries(), interception.types()).await?;
            runner.record_applied(&descriptor.name).await?;
            interception
                .buffer()
                .push(self.tracking.insert(&descriptor.name))
                .await;

            let statements = interception.buffer().since(start).await;
            let result = MigrationResult::new(descriptor.name, Direction::Up, statements);
            self.finish(&result, &options);
            results.push(result);
        }

        Ok(results)
    }

    /// Simulate reverting the most recently executed migration
    pub async fn down(&self, options: RunOptions) -> AppResult<Option<MigrationResult>> {
        let interception = self.install()?;
        let runner = interception.runner();

        let Some(descriptor) = runner.executed().await?.pop() else {
            info!("No executed migrations to revert");
            return Ok(None);
        };
        info!("Simulating revert of {}", descriptor.name);

        let start = interception.buffer().len().await;

        let migration = runner.resolve(&descriptor.name)?;
        migration.down(interception.queries(), interception.types()).await?;
        runner.record_reverted(&descriptor.name).await?;
        interception
            .buffer()
            .push(self.tracking.delete(&descriptor.name))
            .await;

        let statements = interception.buffer().since(start).await;
        let result = MigrationResult::new(descriptor.name, Direction::Down, statements);
        self.finish(&result, &options);

        Ok(Some(result))
    }
}
