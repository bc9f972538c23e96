//! Tracking storage
//!
//! Records which migrations have been applied.

use crate::error::AppResult;
use crate::query::interface::quote_literal;
use crate::query::{Dialect, Query, QueryExecutor, QueryKind};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Where applied-migration records live
#[async_trait]
pub trait MigrationStorage: Send + Sync {
    /// Names of executed migrations, oldest first
    async fn executed(&self) -> AppResult<Vec<String>>;

    async fn log_migration(&self, name: &str) -> AppResult<()>;

    async fn unlog_migration(&self, name: &str) -> AppResult<()>;
}

/// Tracking table with a single `name` column
pub struct TableStorage {
    executor: Arc<dyn QueryExecutor>,
    table: String,
    dialect: Dialect,
}

impl TableStorage {
    pub fn new(
        executor: Arc<dyn QueryExecutor>,
        table: impl Into<String>,
        dialect: Dialect,
    ) -> Self {
        Self {
            executor,
            table: table.into(),
            dialect,
        }
    }

    fn placeholder(&self) -> &'static str {
        match self.dialect {
            Dialect::Postgres => "$1",
            Dialect::MySql => "?",
        }
    }

    /// Only the schema (Postgres) or database (MySQL) the connection uses counts
    async fn table_exists(&self) -> AppResult<bool> {
        let current_schema = match self.dialect {
            Dialect::Postgres => "current_schema()",
            Dialect::MySql => "DATABASE()",
        };
        let sql = format!(
            "SELECT table_name FROM information_schema.tables \
             WHERE table_name = {} AND table_schema = {};",
            quote_literal(&self.table),
            current_schema
        );
        let rows = self
            .executor
            .execute(Query::sql(sql, QueryKind::Select))
            .await?
            .into_rows();
        Ok(!rows.is_empty())
    }

    async fn ensure_table(&self) -> AppResult<()> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} ({} VARCHAR(255) NOT NULL PRIMARY KEY);",
            self.dialect.quote(&self.table),
            self.dialect.quote("name")
        );
        self.executor.execute(Query::sql(sql, QueryKind::Raw)).await?;
        Ok(())
    }
}

#[async_trait]
impl MigrationStorage for TableStorage {
    async fn executed(&self) -> AppResult<Vec<String>> {
        if !self.table_exists().await? {
            debug!("Tracking table {} does not exist yet", self.table);
            return Ok(Vec::new());
        }

        let name = self.dialect.quote("name");
        let sql = format!(
            "SELECT {} FROM {} ORDER BY {} ASC;",
            name,
            self.dialect.quote(&self.table),
            name
        );
        let rows = self
            .executor
            .execute(Query::sql(sql, QueryKind::Select))
            .await?
            .into_rows();

        Ok(rows
            .into_iter()
            .filter_map(|row| row.get("name").and_then(|v| v.as_str()).map(str::to_string))
            .collect())
    }

    async fn log_migration(&self, name: &str) -> AppResult<()> {
        self.ensure_table().await?;
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.dialect.quote(&self.table),
            self.dialect.quote("name"),
            self.placeholder()
        );
        self.executor
            .execute(Query::bound(sql, vec![name.to_string()], QueryKind::Insert))
            .await?;
        Ok(())
    }

    async fn unlog_migration(&self, name: &str) -> AppResult<()> {
        self.ensure_table().await?;
        let sql = format!(
            "DELETE FROM {} WHERE {} = {}",
            self.dialect.quote(&self.table),
            self.dialect.quote("name"),
            self.placeholder()
        );
        self.executor
            .execute(Query::bound(sql, vec![name.to_string()], QueryKind::Delete))
            .await?;
        Ok(())
    }
}

/// In-process storage
#[derive(Default)]
pub struct MemoryStorage {
    executed: RwLock<Vec<String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_executed<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            executed: RwLock::new(names.into_iter().map(Into::into).collect()),
        }
    }
}

#[async_trait]
impl MigrationStorage for MemoryStorage {
    async fn executed(&self) -> AppResult<Vec<String>> {
        Ok(self.executed.read().await.clone())
    }

    async fn log_migration(&self, name: &str) -> AppResult<()> {
        let mut executed = self.executed.write().await;
        if !executed.iter().any(|n| n == name) {
            executed.push(name.to_string());
        }
        Ok(())
    }

    async fn unlog_migration(&self, name: &str) -> AppResult<()> {
        self.executed.write().await.retain(|n| n != name);
        Ok(())
    }
}
