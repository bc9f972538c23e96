//! Interception layer
//!
//! A dry run swaps two things for the duration of one run: the execution
//! strategy (captures mutations instead of running them) and the tracking
//! storage's write hooks (no-ops). Both are injected into a run-scoped
//! runner and query interface; the database handle itself is never touched.

use super::classifier::{classify_query, Disposition};
use crate::db::Database;
use crate::error::AppResult;
use crate::migration::{MigrationRegistry, MigrationRunner, MigrationStorage, TableStorage};
use crate::query::{Query, QueryExecutor, QueryInterface, QueryOutcome, TypeRegistry};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Statements captured during one run
#[derive(Clone, Default)]
pub struct CaptureBuffer {
    statements: Arc<Mutex<Vec<String>>>,
}

impl CaptureBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push(&self, statement: String) {
        self.statements.lock().await.push(statement);
    }

    pub async fn len(&self) -> usize {
        self.statements.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.statements.lock().await.is_empty()
    }

    /// Everything captured from position `start` on
    pub async fn since(&self, start: usize) -> Vec<String> {
        let statements = self.statements.lock().await;
        statements.get(start..).map(<[String]>::to_vec).unwrap_or_default()
    }
}

/// Execution strategy that lets metadata reads through and captures the rest
pub struct CapturingExecutor {
    inner: Arc<dyn QueryExecutor>,
    buffer: CaptureBuffer,
    tracking_table: String,
    verbose: bool,
}

impl CapturingExecutor {
    pub fn new(
        inner: Arc<dyn QueryExecutor>,
        buffer: CaptureBuffer,
        tracking_table: &str,
        verbose: bool,
    ) -> Self {
        Self {
            inner,
            buffer,
            tracking_table: tracking_table.to_lowercase(),
            verbose,
        }
    }
}

#[async_trait]
impl QueryExecutor for CapturingExecutor {
    async fn execute(&self, query: Query) -> AppResult<QueryOutcome> {
        match classify_query(&query, &self.tracking_table) {
            Disposition::PassThrough => {
                let sql = query.text().unwrap_or("<bound query>");
                if self.verbose {
                    info!(kind = ?query.kind, "pass-through: {}", sql);
                } else {
                    debug!(kind = ?query.kind, "pass-through: {}", sql);
                }
                self.inner.execute(query).await
            }
            Disposition::Capture => {
                let kind = query.kind;
                let sql = query.text().unwrap_or_default().to_string();
                if self.verbose {
                    info!(kind = ?kind, "captured: {}", sql);
                } else {
                    debug!(kind = ?kind, "captured: {}", sql);
                }
                self.buffer.push(sql).await;
                Ok(QueryOutcome::inert(kind))
            }
        }
    }
}

/// Storage that reads through but never writes
pub struct DryRunStorage {
    inner: Arc<dyn MigrationStorage>,
}

impl DryRunStorage {
    pub fn new(inner: Arc<dyn MigrationStorage>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl MigrationStorage for DryRunStorage {
    async fn executed(&self) -> AppResult<Vec<String>> {
        self.inner.executed().await
    }

    async fn log_migration(&self, name: &str) -> AppResult<()> {
        debug!("Skipping tracking insert for {}", name);
        Ok(())
    }

    async fn unlog_migration(&self, name: &str) -> AppResult<()> {
        debug!("Skipping tracking delete for {}", name);
        Ok(())
    }
}

/// One run's intercepted environment
///
/// Holds the only run-scoped clones of the database executor and storage;
/// dropping it releases them on every exit path.
pub struct Interception {
    buffer: CaptureBuffer,
    queries: QueryInterface,
    runner: MigrationRunner,
}

impl Interception {
    /// Build the capturing executor and no-op-write storage for one run.
    ///
    /// Without an explicit `storage`, the tracking table is read through
    /// the capturing executor so its own DDL is captured too.
    pub fn install(
        database: &Database,
        registry: Arc<MigrationRegistry>,
        storage: Option<Arc<dyn MigrationStorage>>,
        tracking_table: &str,
        verbose: bool,
    ) -> Self {
        let buffer = CaptureBuffer::new();
        let executor: Arc<dyn QueryExecutor> = Arc::new(CapturingExecutor::new(
            database.executor().clone(),
            buffer.clone(),
            tracking_table,
            verbose,
        ));

        let storage: Arc<dyn MigrationStorage> = match storage {
            Some(storage) => storage,
            None => Arc::new(TableStorage::new(
                executor.clone(),
                tracking_table,
                database.dialect(),
            )),
        };
        let runner = MigrationRunner::new(registry, Arc::new(DryRunStorage::new(storage)));

        debug!("Dry-run interception installed (tracking table: {})", tracking_table);

        Self {
            buffer,
            queries: QueryInterface::new(executor, database.dialect()),
            runner,
        }
    }

    pub fn buffer(&self) -> &CaptureBuffer {
        &self.buffer
    }

    pub fn queries(&self) -> &QueryInterface {
        &self.queries
    }

    pub fn types(&self) -> &TypeRegistry {
        self.queries.types()
    }

    pub fn runner(&self) -> &MigrationRunner {
        &self.runner
    }
}

impl Drop for Interception {
    fn drop(&mut self) {
        debug!("Dry-run interception released");
    }
}
