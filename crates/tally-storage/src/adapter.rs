// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StatsStore trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use tally_config::StorageConfig;
use tally_core::{
    HealthStatus, PluginAdapter, Product, ProductId, StatsStore, TallyError, UserId, ViewerEvent,
};

use crate::database::{Database, map_call_err, map_tr_err};
use crate::queries;
use crate::recorder::record_stats;

/// SQLite-backed stats store.
///
/// The database is opened on [`StatsStore::initialize`]; every other operation
/// fails with `TallyError::Storage` until then.
pub struct SqliteStatsStore {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStatsStore {
    /// Create a new store. The database is not opened until `initialize`.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Wrap an already opened database.
    pub fn from_database(config: StorageConfig, db: Database) -> Self {
        Self {
            config,
            db: OnceCell::new_with(Some(db)),
        }
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Returns the underlying Database, or an error if not initialized.
    pub fn db(&self) -> Result<&Database, TallyError> {
        self.db.get().ok_or_else(|| TallyError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteStatsStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    async fn health_check(&self) -> Result<HealthStatus, TallyError> {
        let db = self.db()?;
        let missing: Vec<String> = db
            .connection()
            .call(|conn| -> Result<Vec<String>, rusqlite::Error> {
                let mut missing = Vec::new();
                for table in ["products", "product_viewers"] {
                    let found: i64 = conn.query_row(
                        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                        [table],
                        |row| row.get(0),
                    )?;
                    if found == 0 {
                        missing.push(table.to_string());
                    }
                }
                Ok(missing)
            })
            .await
            .map_err(map_tr_err)?;

        if missing.is_empty() {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Unhealthy(format!(
                "missing tables: {}",
                missing.join(", ")
            )))
        }
    }

    async fn shutdown(&self) -> Result<(), TallyError> {
        if let Some(db) = self.db.get() {
            db.close().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StatsStore for SqliteStatsStore {
    async fn initialize(&self) -> Result<(), TallyError> {
        let db = Database::open(&self.config).await?;
        self.db.set(db).map_err(|_| TallyError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite stats store initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), TallyError> {
        self.db()?.close().await
    }

    async fn record_view(&self, user_id: UserId, product_id: ProductId) -> Result<(), TallyError> {
        self.db()?
            .connection()
            .call(move |conn| record_stats(conn, user_id, product_id))
            .await
            .map_err(map_call_err)?;
        info!(%user_id, %product_id, "view recorded");
        Ok(())
    }

    async fn product(&self, id: ProductId) -> Result<Option<Product>, TallyError> {
        queries::products::get_product(self.db()?, id).await
    }

    async fn products(&self) -> Result<Vec<Product>, TallyError> {
        queries::products::list_products(self.db()?).await
    }

    async fn viewers(&self, id: ProductId) -> Result<Vec<ViewerEvent>, TallyError> {
        queries::viewers::list_viewers(self.db()?, id).await
    }
}
