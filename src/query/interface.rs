//! Query interface
//!
//! Generates DDL/DML for schema operations and sends each statement through
//! the configured executor. Migrations only ever talk to the database
//! through this type.

use super::types::{ColumnDef, TypeRegistry};
use super::{Query, QueryExecutor, QueryKind, QueryOutcome, Row};
use crate::error::AppResult;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// SQL dialect, decides identifier quoting and a few statement shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    MySql,
}

impl Dialect {
    /// Quote an identifier, doubling any embedded quote character
    pub fn quote(&self, ident: &str) -> String {
        match self {
            Dialect::Postgres => format!("\"{}\"", ident.replace('"', "\"\"")),
            Dialect::MySql => format!("`{}`", ident.replace('`', "``")),
        }
    }
}

/// Quote a string literal
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Index definition for `add_index`
#[derive(Debug, Clone, PartialEq)]
pub struct IndexDef {
    pub name: Option<String>,
    pub columns: Vec<String>,
    pub unique: bool,
}

impl IndexDef {
    pub fn on<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: None,
            columns: columns.into_iter().map(Into::into).collect(),
            unique: false,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    fn resolved_name(&self, table: &str) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("{}_{}", table, self.columns.join("_")))
    }
}

/// Schema-operation front end over an executor
#[derive(Clone)]
pub struct QueryInterface {
    executor: Arc<dyn QueryExecutor>,
    types: TypeRegistry,
}

impl QueryInterface {
    pub fn new(executor: Arc<dyn QueryExecutor>, dialect: Dialect) -> Self {
        Self {
            executor,
            types: TypeRegistry::new(dialect),
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.types.dialect()
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    fn quote(&self, ident: &str) -> String {
        self.dialect().quote(ident)
    }

    /// Send a query through the executor
    pub async fn execute(&self, query: Query) -> AppResult<QueryOutcome> {
        if let Some(sql) = query.text() {
            debug!(kind = ?query.kind, "query: {}", sql);
        }
        self.executor.execute(query).await
    }

    /// Raw SQL with an explicit kind
    pub async fn query(&self, sql: impl Into<String>, kind: QueryKind) -> AppResult<QueryOutcome> {
        self.execute(Query::sql(sql, kind)).await
    }

    pub async fn create_table(&self, table: &str, columns: &[ColumnDef]) -> AppResult<()> {
        let cols: Vec<String> = columns.iter().map(|c| self.types.column_sql(c)).collect();
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} ({});",
            self.quote(table),
            cols.join(", ")
        );
        self.query(sql, QueryKind::Raw).await?;
        Ok(())
    }

    pub async fn drop_table(&self, table: &str) -> AppResult<()> {
        let sql = format!("DROP TABLE IF EXISTS {};", self.quote(table));
        self.query(sql, QueryKind::Raw).await?;
        Ok(())
    }

    pub async fn rename_table(&self, old_name: &str, new_name: &str) -> AppResult<()> {
        let sql = match self.dialect() {
            Dialect::Postgres => format!(
                "ALTER TABLE {} RENAME TO {};",
                self.quote(old_name),
                self.quote(new_name)
            ),
            Dialect::MySql => format!(
                "RENAME TABLE {} TO {};",
                self.quote(old_name),
                self.quote(new_name)
            ),
        };
        self.query(sql, QueryKind::Raw).await?;
        Ok(())
    }

    pub async fn add_column(&self, table: &str, column: &ColumnDef) -> AppResult<()> {
        let sql = format!(
            "ALTER TABLE {} ADD COLUMN {};",
            self.quote(table),
            self.types.column_sql(column)
        );
        self.query(sql, QueryKind::Raw).await?;
        Ok(())
    }

    pub async fn remove_column(&self, table: &str, column: &str) -> AppResult<()> {
        let sql = format!(
            "ALTER TABLE {} DROP COLUMN {};",
            self.quote(table),
            self.quote(column)
        );
        self.query(sql, QueryKind::Raw).await?;
        Ok(())
    }

    /// Change type and nullability of an existing column
    pub async fn change_column(&self, table: &str, column: &ColumnDef) -> AppResult<()> {
        let sql = match self.dialect() {
            Dialect::Postgres => {
                let name = self.quote(&column.name);
                let nullability = if column.nullable { "DROP NOT NULL" } else { "SET NOT NULL" };
                format!(
                    "ALTER TABLE {} ALTER COLUMN {} TYPE {}, ALTER COLUMN {} {};",
                    self.quote(table),
                    name,
                    self.types.sql(column.data_type),
                    name,
                    nullability
                )
            }
            Dialect::MySql => format!(
                "ALTER TABLE {} MODIFY {};",
                self.quote(table),
                self.types.column_sql(column)
            ),
        };
        self.query(sql, QueryKind::Raw).await?;
        Ok(())
    }

    pub async fn rename_column(
        &self,
        table: &str,
        old_name: &str,
        new_name: &str,
    ) -> AppResult<()> {
        let sql = format!(
            "ALTER TABLE {} RENAME COLUMN {} TO {};",
            self.quote(table),
            self.quote(old_name),
            self.quote(new_name)
        );
        self.query(sql, QueryKind::Raw).await?;
        Ok(())
    }

    pub async fn add_index(&self, table: &str, index: &IndexDef) -> AppResult<()> {
        let cols: Vec<String> = index.columns.iter().map(|c| self.quote(c)).collect();
        let sql = format!(
            "CREATE {}INDEX {} ON {} ({});",
            if index.unique { "UNIQUE " } else { "" },
            self.quote(&index.resolved_name(table)),
            self.quote(table),
            cols.join(", ")
        );
        self.query(sql, QueryKind::Raw).await?;
        Ok(())
    }

    pub async fn remove_index(&self, table: &str, index_name: &str) -> AppResult<()> {
        let sql = match self.dialect() {
            Dialect::Postgres => format!("DROP INDEX IF EXISTS {};", self.quote(index_name)),
            Dialect::MySql => format!(
                "DROP INDEX {} ON {};",
                self.quote(index_name),
                self.quote(table)
            ),
        };
        self.query(sql, QueryKind::Raw).await?;
        Ok(())
    }

    /// Insert literal rows; returns affected row count
    pub async fn bulk_insert(
        &self,
        table: &str,
        columns: &[&str],
        rows: &[Vec<Value>],
    ) -> AppResult<u64> {
        if rows.is_empty() {
            return Ok(0);
        }

        let cols: Vec<String> = columns.iter().map(|c| self.quote(c)).collect();
        let values: Vec<String> = rows
            .iter()
            .map(|row| {
                let literals: Vec<String> = row.iter().map(value_literal).collect();
                format!("({})", literals.join(","))
            })
            .collect();

        let sql = format!(
            "INSERT INTO {} ({}) VALUES {};",
            self.quote(table),
            cols.join(","),
            values.join(",")
        );
        Ok(self.query(sql, QueryKind::Insert).await?.affected())
    }

    /// Delete rows whose `column` matches one of `values`
    pub async fn bulk_delete(&self, table: &str, column: &str, values: &[Value]) -> AppResult<u64> {
        if values.is_empty() {
            return Ok(0);
        }

        let literals: Vec<String> = values.iter().map(value_literal).collect();
        let sql = format!(
            "DELETE FROM {} WHERE {} IN ({});",
            self.quote(table),
            self.quote(column),
            literals.join(", ")
        );
        Ok(self.query(sql, QueryKind::Delete).await?.affected())
    }

    /// Column metadata for a table
    pub async fn describe_table(&self, table: &str) -> AppResult<Vec<Row>> {
        let sql = match self.dialect() {
            Dialect::MySql => format!("DESCRIBE {};", self.quote(table)),
            Dialect::Postgres => format!(
                "SELECT column_name, data_type, is_nullable, column_default \
                 FROM information_schema.columns WHERE table_name = {} \
                 ORDER BY ordinal_position;",
                quote_literal(table)
            ),
        };
        Ok(self.query(sql, QueryKind::Describe).await?.into_rows())
    }

    /// Names of user tables
    pub async fn show_tables(&self) -> AppResult<Vec<String>> {
        let sql = match self.dialect() {
            Dialect::MySql => "SHOW TABLES;".to_string(),
            Dialect::Postgres => "SELECT table_name FROM information_schema.tables \
                                  WHERE table_schema = current_schema() ORDER BY table_name;"
                .to_string(),
        };

        let rows = self.query(sql, QueryKind::Describe).await?.into_rows();
        Ok(rows
            .into_iter()
            .filter_map(|row| row.into_iter().next())
            .filter_map(|(_, value)| value.as_str().map(str::to_string))
            .collect())
    }
}

/// Render a JSON value as an SQL literal
fn value_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(true) => "TRUE".to_string(),
        Value::Bool(false) => "FALSE".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote_literal(s),
        other => quote_literal(&other.to_string()),
    }
}
