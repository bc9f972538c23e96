//! Migration runner
//!
//! Owns migration discovery, ordering, and the tracking-table bookkeeping
//! that decides what is pending and what has already been executed.

mod registry;
mod runner;
mod storage;

pub use registry::{MigrationRegistry, SqlMigration};
pub use runner::MigrationRunner;
pub use storage::{MemoryStorage, MigrationStorage, TableStorage};

use crate::error::AppResult;
use crate::query::{QueryInterface, TypeRegistry};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Migration direction for execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Apply the migration
    Up,
    /// Revert the migration
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
        }
    }
}

/// Identity of a migration as reported by the runner
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationDescriptor {
    pub name: String,
}

impl MigrationDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A named unit of schema change
#[async_trait]
pub trait Migration: Send + Sync {
    async fn up(&self, queries: &QueryInterface, types: &TypeRegistry) -> AppResult<()>;

    async fn down(&self, queries: &QueryInterface, types: &TypeRegistry) -> AppResult<()>;
}
