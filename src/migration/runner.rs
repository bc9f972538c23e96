//! Migration Runner - pending/executed discovery over a registry and a storage

use super::{Migration, MigrationDescriptor, MigrationRegistry, MigrationStorage};
use crate::error::AppResult;
use std::collections::HashSet;
use std::sync::Arc;

/// Migration runner that resolves migrations and tracks their state
pub struct MigrationRunner {
    registry: Arc<MigrationRegistry>,
    storage: Arc<dyn MigrationStorage>,
}

impl MigrationRunner {
    pub fn new(registry: Arc<MigrationRegistry>, storage: Arc<dyn MigrationStorage>) -> Self {
        Self { registry, storage }
    }

    /// Executed migrations in storage order (oldest first)
    pub async fn executed(&self) -> AppResult<Vec<MigrationDescriptor>> {
        Ok(self
            .storage
            .executed()
            .await?
            .into_iter()
            .map(MigrationDescriptor::new)
            .collect())
    }

    /// Registered migrations that have not been executed, in registry order
    pub async fn pending(&self) -> AppResult<Vec<MigrationDescriptor>> {
        let executed: HashSet<String> = self.storage.executed().await?.into_iter().collect();

        Ok(self
            .registry
            .names()
            .filter(|name| !executed.contains(*name))
            .map(MigrationDescriptor::new)
            .collect())
    }

    pub fn resolve(&self, name: &str) -> AppResult<Arc<dyn Migration>> {
        self.registry.get(name)
    }

    /// Mark a migration as applied
    pub async fn record_applied(&self, name: &str) -> AppResult<()> {
        self.storage.log_migration(name).await
    }

    /// Remove a migration's applied record
    pub async fn record_reverted(&self, name: &str) -> AppResult<()> {
        self.storage.unlog_migration(name).await
    }
}
