// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Viewer event queries. Events are append-only; there is no update or delete.

use rusqlite::params;
use tally_core::{ProductId, TallyError, UserId, ViewerEvent};

use crate::database::{Database, map_tr_err};

/// List viewer events for a product, oldest first.
pub async fn list_viewers(
    db: &Database,
    product_id: ProductId,
) -> Result<Vec<ViewerEvent>, TallyError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, product_id, viewed_at
                 FROM product_viewers WHERE product_id = ?1 ORDER BY id ASC",
            )?;
            let rows = stmt.query_map(params![product_id.0], |row| {
                Ok(ViewerEvent {
                    id: row.get(0)?,
                    user_id: UserId(row.get(1)?),
                    product_id: ProductId(row.get(2)?),
                    viewed_at: row.get(3)?,
                })
            })?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

/// Total number of viewer events across all products.
pub async fn count_events(db: &Database) -> Result<i64, TallyError> {
    db.connection()
        .call(|conn| conn.query_row("SELECT COUNT(*) FROM product_viewers", [], |row| row.get(0)))
        .await
        .map_err(map_tr_err)
}
