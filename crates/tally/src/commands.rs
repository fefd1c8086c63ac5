// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Subcommand handlers.
//!
//! Each handler opens the configured store, does its work, and shuts the store
//! down so the WAL is checkpointed before the process exits.

use std::io::Write;

use tally_config::TallyConfig;
use tally_core::{HealthStatus, PluginAdapter, ProductId, StatsStore, TallyError, UserId};
use tally_storage::{SqliteStatsStore, queries};
use tracing::info;

use crate::Commands;

/// Runs one subcommand against the configured database, writing its report to `out`.
pub async fn run<W: Write>(
    command: Commands,
    config: &TallyConfig,
    out: &mut W,
) -> Result<(), TallyError> {
    let store = SqliteStatsStore::new(config.storage.clone());
    store.initialize().await?;

    let result = dispatch(command, &store, out).await;
    let shutdown = store.shutdown().await;
    result.and(shutdown)
}

async fn dispatch<W: Write>(
    command: Commands,
    store: &SqliteStatsStore,
    out: &mut W,
) -> Result<(), TallyError> {
    match command {
        Commands::Init => {
            info!(path = %store_path(store), "database ready");
            writeln!(out, "initialized {}", store_path(store)).map_err(io_err)
        }
        Commands::AddProduct { id, name } => {
            queries::products::create_product(store.db()?, ProductId(id), &name).await?;
            writeln!(out, "added product {id}").map_err(io_err)
        }
        Commands::Record { user, product } => {
            store.record_view(UserId(user), ProductId(product)).await?;
            writeln!(out, "recorded view of product {product} by user {user}").map_err(io_err)
        }
        Commands::Views { product: None } => {
            for p in store.products().await? {
                writeln!(out, "{}\t{}\t{}", p.id, p.views, p.name).map_err(io_err)?;
            }
            Ok(())
        }
        Commands::Views {
            product: Some(id),
        } => {
            let product = store
                .product(ProductId(id))
                .await?
                .ok_or_else(|| TallyError::Internal(format!("product {id} not found")))?;
            writeln!(out, "product {} ({}): {} views", product.id, product.name, product.views)
                .map_err(io_err)?;
            for event in store.viewers(ProductId(id)).await? {
                writeln!(out, "{}\tuser {}", event.viewed_at, event.user_id).map_err(io_err)?;
            }
            Ok(())
        }
        Commands::Doctor => doctor(store, out).await,
    }
}

async fn doctor<W: Write>(store: &SqliteStatsStore, out: &mut W) -> Result<(), TallyError> {
    let status = store.health_check().await?;
    let db = store.db()?;
    let products = queries::products::list_products(db).await?.len();
    let views = queries::products::total_views(db).await?;
    let events = queries::viewers::count_events(db).await?;

    writeln!(out, "database: {}", store_path(store)).map_err(io_err)?;
    writeln!(out, "products: {products}").map_err(io_err)?;
    writeln!(out, "views: {views}").map_err(io_err)?;
    writeln!(out, "viewer events: {events}").map_err(io_err)?;

    match status {
        HealthStatus::Healthy => writeln!(out, "status: healthy").map_err(io_err),
        HealthStatus::Unhealthy(reason) => Err(TallyError::Storage {
            source: format!("database unhealthy: {reason}").into(),
        }),
    }
}

fn store_path(store: &SqliteStatsStore) -> &str {
    &store.config().database_path
}

fn io_err(e: std::io::Error) -> TallyError {
    TallyError::Internal(format!("failed to write output: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_config::{LogConfig, StorageConfig};
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> TallyConfig {
        TallyConfig {
            storage: StorageConfig {
                database_path: dir.path().join("tally.db").to_string_lossy().into_owned(),
                wal_mode: true,
                busy_timeout_ms: 1_000,
            },
            log: LogConfig::default(),
        }
    }

    async fn run_to_string(command: Commands, config: &TallyConfig) -> Result<String, TallyError> {
        let mut out = Vec::new();
        run(command, config, &mut out).await?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[tokio::test]
    async fn record_then_views_reports_counts_and_viewers() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);

        run_to_string(Commands::Init, &config).await.unwrap();
        run_to_string(
            Commands::AddProduct {
                id: 3,
                name: "kettle".into(),
            },
            &config,
        )
        .await
        .unwrap();
        let recorded = run_to_string(Commands::Record { user: 2, product: 3 }, &config)
            .await
            .unwrap();
        assert!(recorded.contains("product 3 by user 2"));

        let listing = run_to_string(Commands::Views { product: None }, &config)
            .await
            .unwrap();
        assert_eq!(listing, "3\t1\tkettle\n");

        let detail = run_to_string(Commands::Views { product: Some(3) }, &config)
            .await
            .unwrap();
        assert!(detail.starts_with("product 3 (kettle): 1 views\n"));
        assert!(detail.contains("user 2"));
    }

    #[tokio::test]
    async fn record_for_unknown_product_fails_and_keeps_counters() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);
        run_to_string(
            Commands::AddProduct {
                id: 1,
                name: "lamp".into(),
            },
            &config,
        )
        .await
        .unwrap();

        let err = run_to_string(Commands::Record { user: 2, product: 99 }, &config)
            .await
            .unwrap_err();
        assert!(matches!(err, TallyError::Statement { .. }));

        let listing = run_to_string(Commands::Views { product: None }, &config)
            .await
            .unwrap();
        assert_eq!(listing, "1\t0\tlamp\n");
    }

    #[tokio::test]
    async fn views_for_missing_product_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_to_string(Commands::Views { product: Some(7) }, &config(&dir))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("product 7 not found"));
    }

    #[tokio::test]
    async fn doctor_reports_healthy_database() {
        let dir = tempfile::tempdir().unwrap();
        let report = run_to_string(Commands::Doctor, &config(&dir)).await.unwrap();
        assert!(report.contains("products: 0"));
        assert!(report.contains("viewer events: 0"));
        assert!(report.ends_with("status: healthy\n"));
    }
}
