// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup and schema bootstrap.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! Do NOT create additional Connection instances for writes.

use std::path::Path;
use std::time::Duration;

use tally_config::StorageConfig;
use tally_core::TallyError;
use tokio_rusqlite::Connection;
use tracing::debug;

use crate::schema;

/// The single writer handle for a Tally database.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (creating if needed) the database file named by `config`, apply
    /// connection PRAGMAs and bootstrap the schema.
    pub async fn open(config: &StorageConfig) -> Result<Self, TallyError> {
        let path = Path::new(&config.database_path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(TallyError::storage)?;
        }

        let conn = Connection::open(path).await.map_err(TallyError::storage)?;
        let db = Self { conn };
        db.prepare(config.wal_mode, config.busy_timeout_ms).await?;
        debug!(path = %config.database_path, wal = config.wal_mode, "database opened");
        Ok(db)
    }

    /// Open a private in-memory database with the schema bootstrapped.
    pub async fn open_in_memory() -> Result<Self, TallyError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(TallyError::storage)?;
        let db = Self { conn };
        db.prepare(false, 0).await?;
        Ok(db)
    }

    async fn prepare(&self, wal_mode: bool, busy_timeout_ms: u64) -> Result<(), TallyError> {
        self.conn
            .call(move |conn| -> Result<(), rusqlite::Error> {
                if wal_mode {
                    let mode: String =
                        conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
                    debug!(journal_mode = %mode, "journal mode set");
                }
                conn.execute_batch("PRAGMA foreign_keys = ON;")?;
                conn.busy_timeout(Duration::from_millis(busy_timeout_ms))?;
                schema::bootstrap(conn)
            })
            .await
            .map_err(map_tr_err)
    }

    /// The underlying tokio-rusqlite connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Checkpoint the WAL so the main database file is self-contained.
    pub async fn close(&self) -> Result<(), TallyError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

/// Convert a tokio-rusqlite error into `TallyError::Storage`.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> TallyError {
    TallyError::Storage {
        source: Box::new(e),
    }
}

/// Unwrap a `TallyError` produced inside `call`, or report the connection failure.
pub(crate) fn map_call_err(e: tokio_rusqlite::Error<TallyError>) -> TallyError {
    match e {
        tokio_rusqlite::Error::Error(inner) => inner,
        tokio_rusqlite::Error::ConnectionClosed => TallyError::Storage {
            source: "database connection closed".into(),
        },
        _ => TallyError::Storage {
            source: "database connection failed".into(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn config_for(path: &Path) -> StorageConfig {
        StorageConfig {
            database_path: path.to_string_lossy().into_owned(),
            wal_mode: true,
            busy_timeout_ms: 1_000,
        }
    }

    #[tokio::test]
    async fn open_creates_file_and_parent_dirs() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested").join("tally.db");
        let db = Database::open(&config_for(&db_path)).await.unwrap();
        assert!(db_path.exists(), "database file should be created");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn open_enables_wal_and_foreign_keys() {
        let dir = tempdir().unwrap();
        let db = Database::open(&config_for(&dir.path().join("wal.db")))
            .await
            .unwrap();
        let (mode, fk): (String, i64) = db
            .connection()
            .call(|conn| -> Result<_, rusqlite::Error> {
                let mode = conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))?;
                let fk = conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0))?;
                Ok((mode, fk))
            })
            .await
            .unwrap();
        assert_eq!(mode, "wal");
        assert_eq!(fk, 1);
    }

    #[tokio::test]
    async fn reopening_keeps_data() {
        let dir = tempdir().unwrap();
        let config = config_for(&dir.path().join("reopen.db"));
        {
            let db = Database::open(&config).await.unwrap();
            db.connection()
                .call(|conn| -> Result<(), rusqlite::Error> {
                    conn.execute("INSERT INTO products (id, views) VALUES (9, 4)", [])?;
                    Ok(())
                })
                .await
                .unwrap();
            db.close().await.unwrap();
        }
        let db = Database::open(&config).await.unwrap();
        let views: i64 = db
            .connection()
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.query_row("SELECT views FROM products WHERE id = 9", [], |row| {
                    row.get(0)
                })
            })
            .await
            .unwrap();
        assert_eq!(views, 4);
    }
}
