//! Error handling module
//!
//! Provides the unified error type used across the dry-run engine.

use thiserror::Error;

/// Crate-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Raised by migration code itself; passed through the orchestrator untouched
    #[error("Migration failed: {0}")]
    Migration(#[from] anyhow::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid migrations pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("Failed to read migration path: {0}")]
    Glob(#[from] glob::GlobError),
}

/// Result alias used throughout the crate
pub type AppResult<T> = Result<T, AppError>;

/// Helper function to create a configuration error
pub fn config_error(msg: impl Into<String>) -> AppError {
    AppError::Config(msg.into())
}

/// Helper function to create a not found error
pub fn not_found_error(msg: impl Into<String>) -> AppError {
    AppError::NotFound(msg.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_error_keeps_message() {
        let err: AppError = anyhow::anyhow!("column \"email\" already exists").into();
        assert_eq!(err.to_string(), "Migration failed: column \"email\" already exists");
    }

    #[test]
    fn test_helpers() {
        assert!(matches!(config_error("x"), AppError::Config(m) if m == "x"));
        assert!(matches!(not_found_error("y"), AppError::NotFound(m) if m == "y"));
    }
}
