//! Database connection management
//!
//! Connection pooling for the target database and the real execution
//! strategy that sends queries to it.

use crate::config::DatabaseConfig;
use crate::error::{config_error, AppResult};
use crate::query::{Dialect, Query, QueryBody, QueryExecutor, QueryInterface, QueryOutcome, Row};
use async_trait::async_trait;
use deadpool_postgres::{Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime};
use postgres_types::{ToSql, Type};
use serde_json::Value;
use std::sync::Arc;
use tokio_postgres::NoTls;
use tracing::{debug, info};

/// Handle to the target database: an execution strategy plus its dialect
#[derive(Clone)]
pub struct Database {
    executor: Arc<dyn QueryExecutor>,
    dialect: Dialect,
}

impl Database {
    pub fn new(executor: Arc<dyn QueryExecutor>, dialect: Dialect) -> Self {
        Self { executor, dialect }
    }

    /// Postgres database backed by a connection pool
    pub fn postgres(pool: Pool) -> Self {
        Self::new(Arc::new(PostgresExecutor::new(pool)), Dialect::Postgres)
    }

    pub fn executor(&self) -> &Arc<dyn QueryExecutor> {
        &self.executor
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Query interface that executes for real
    pub fn query_interface(&self) -> QueryInterface {
        QueryInterface::new(self.executor.clone(), self.dialect)
    }
}

/// Create a connection pool with given configuration
pub fn create_pool(config: &DatabaseConfig) -> AppResult<Pool> {
    let mut cfg = Config::new();
    cfg.host = Some(config.host.clone());
    cfg.port = Some(config.port);
    cfg.user = Some(config.user.clone());
    cfg.password = Some(config.password.clone());
    cfg.dbname = Some(config.database.clone());
    cfg.manager = Some(ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    });
    cfg.pool = Some(PoolConfig::new(config.max_pool_size));

    // Neon and other hosted Postgres require TLS
    let use_tls = config.require_tls || config.host.contains("neon.tech");

    let pool = if use_tls {
        let certs = rustls_native_certs::load_native_certs();
        let mut root_store = rustls::RootCertStore::empty();
        for cert in certs.certs {
            root_store.add(cert).ok();
        }

        let tls_config = rustls::ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth();

        let tls = tokio_postgres_rustls::MakeRustlsConnect::new(tls_config);
        cfg.create_pool(Some(Runtime::Tokio1), tls)
            .map_err(|e| config_error(format!("Failed to create TLS pool: {}", e)))?
    } else {
        cfg.create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| config_error(format!("Failed to create pool: {}", e)))?
    };

    info!(
        "Connection pool created for {}:{}/{} (TLS: {})",
        config.host, config.port, config.database, use_tls
    );
    Ok(pool)
}

/// Verify the pool can reach the database
pub async fn check_connection(pool: &Pool) -> AppResult<()> {
    let client = pool.get().await?;
    client.query_one("SELECT 1", &[]).await?;
    debug!("Database connection verified");
    Ok(())
}

/// Executes queries against Postgres
pub struct PostgresExecutor {
    pool: Pool,
}

impl PostgresExecutor {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QueryExecutor for PostgresExecutor {
    async fn execute(&self, query: Query) -> AppResult<QueryOutcome> {
        let client = self.pool.get().await?;

        let (sql, params) = match &query.body {
            QueryBody::Sql(sql) => (sql.as_str(), Vec::new()),
            QueryBody::Bound { sql, params } => (
                sql.as_str(),
                params.iter().map(|p| p as &(dyn ToSql + Sync)).collect::<Vec<_>>(),
            ),
        };

        if query.kind.is_mutation() {
            let affected = client.execute(sql, &params).await?;
            return Ok(QueryOutcome::Affected(affected));
        }

        let rows = client.query(sql, &params).await?;
        Ok(QueryOutcome::Rows(rows.iter().map(row_to_json).collect()))
    }
}

/// Convert a Postgres row into a JSON object keyed by column name
fn row_to_json(row: &tokio_postgres::Row) -> Row {
    let mut out = Row::new();
    for (idx, column) in row.columns().iter().enumerate() {
        out.insert(column.name().to_string(), cell_to_json(row, idx, column.type_()));
    }
    out
}

fn cell_to_json(row: &tokio_postgres::Row, idx: usize, ty: &Type) -> Value {
    fn get<'a, T>(row: &'a tokio_postgres::Row, idx: usize) -> Option<T>
    where
        T: postgres_types::FromSql<'a>,
    {
        row.try_get::<_, Option<T>>(idx).ok().flatten()
    }

    let value = match *ty {
        Type::BOOL => get::<bool>(row, idx).map(Value::from),
        Type::INT2 => get::<i16>(row, idx).map(Value::from),
        Type::INT4 => get::<i32>(row, idx).map(Value::from),
        Type::INT8 => get::<i64>(row, idx).map(Value::from),
        Type::FLOAT4 => get::<f32>(row, idx).map(Value::from),
        Type::FLOAT8 => get::<f64>(row, idx).map(Value::from),
        Type::JSON | Type::JSONB => get::<Value>(row, idx),
        Type::TIMESTAMPTZ => get::<chrono::DateTime<chrono::Utc>>(row, idx)
            .map(|t| Value::from(t.to_rfc3339())),
        Type::TIMESTAMP => {
            get::<chrono::NaiveDateTime>(row, idx).map(|t| Value::from(t.to_string()))
        }
        Type::DATE => get::<chrono::NaiveDate>(row, idx).map(|d| Value::from(d.to_string())),
        _ => get::<String>(row, idx).map(Value::from),
    };
    value.unwrap_or(Value::Null)
}
