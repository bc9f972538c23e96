//! Query model and the execution seam
//!
//! Every statement a migration issues is a [`Query`] handed to a
//! [`QueryExecutor`]. The executor is the injected execution strategy:
//! the Postgres backend runs queries for real, the dry-run capture layer
//! records them instead.

pub mod interface;
pub mod types;

pub use interface::{Dialect, IndexDef, QueryInterface};
pub use types::{ColumnDef, DataType, TypeRegistry};

use crate::error::AppResult;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

/// A single result row, keyed by column name
pub type Row = Map<String, Value>;

static LEADING_KEYWORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([A-Za-z]+)").expect("valid keyword regex"));

/// `sql` with leading whitespace, `--` line comments and `/* */` block comments removed
pub fn strip_leading_comments(sql: &str) -> &str {
    let mut rest = sql.trim_start();
    loop {
        if let Some(after) = rest.strip_prefix("--") {
            rest = after.find('\n').map_or("", |i| &after[i + 1..]).trim_start();
        } else if let Some(after) = rest.strip_prefix("/*") {
            rest = after.find("*/").map_or("", |i| &after[i + 2..]).trim_start();
        } else {
            return rest;
        }
    }
}

/// Kind of statement, used to shape results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryKind {
    Select,
    Insert,
    Update,
    Delete,
    Describe,
    Raw,
}

impl QueryKind {
    /// Infer the kind from the statement's leading keyword, ignoring leading comments
    pub fn infer(sql: &str) -> Self {
        let keyword = LEADING_KEYWORD
            .captures(strip_leading_comments(sql))
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_ascii_lowercase());

        match keyword.as_deref() {
            Some("select") | Some("with") => QueryKind::Select,
            Some("insert") => QueryKind::Insert,
            Some("update") => QueryKind::Update,
            Some("delete") => QueryKind::Delete,
            Some("describe") | Some("desc") | Some("show") => QueryKind::Describe,
            _ => QueryKind::Raw,
        }
    }

    /// Whether the statement changes rows rather than returning them
    pub fn is_mutation(self) -> bool {
        matches!(self, QueryKind::Insert | QueryKind::Update | QueryKind::Delete)
    }
}

/// Payload of a query
#[derive(Debug, Clone, PartialEq)]
pub enum QueryBody {
    /// Plain SQL text
    Sql(String),
    /// Pre-built statement with bound parameters
    Bound { sql: String, params: Vec<String> },
}

/// A statement plus its kind
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub body: QueryBody,
    pub kind: QueryKind,
}

impl Query {
    /// Plain SQL with an explicit kind
    pub fn sql(sql: impl Into<String>, kind: QueryKind) -> Self {
        Self {
            body: QueryBody::Sql(sql.into()),
            kind,
        }
    }

    /// Plain SQL, kind inferred from the leading keyword
    pub fn raw(sql: impl Into<String>) -> Self {
        let sql = sql.into();
        let kind = QueryKind::infer(&sql);
        Self::sql(sql, kind)
    }

    /// Parameterised statement
    pub fn bound(sql: impl Into<String>, params: Vec<String>, kind: QueryKind) -> Self {
        Self {
            body: QueryBody::Bound {
                sql: sql.into(),
                params,
            },
            kind,
        }
    }

    /// SQL text when the payload is a plain string
    pub fn text(&self) -> Option<&str> {
        match &self.body {
            QueryBody::Sql(sql) => Some(sql),
            QueryBody::Bound { .. } => None,
        }
    }
}

/// What executing a query produced
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    Rows(Vec<Row>),
    Affected(u64),
}

impl QueryOutcome {
    /// Result returned for a statement that was never sent to the database
    pub fn inert(kind: QueryKind) -> Self {
        if kind.is_mutation() {
            QueryOutcome::Affected(0)
        } else {
            QueryOutcome::Rows(Vec::new())
        }
    }

    pub fn into_rows(self) -> Vec<Row> {
        match self {
            QueryOutcome::Rows(rows) => rows,
            QueryOutcome::Affected(_) => Vec::new(),
        }
    }

    pub fn affected(&self) -> u64 {
        match self {
            QueryOutcome::Rows(rows) => rows.len() as u64,
            QueryOutcome::Affected(n) => *n,
        }
    }
}

/// Execution strategy for queries
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(&self, query: Query) -> AppResult<QueryOutcome>;
}
