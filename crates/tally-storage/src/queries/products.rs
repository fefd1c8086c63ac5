// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Product queries.

use rusqlite::{OptionalExtension, params};
use tally_core::{Product, ProductId, TallyError};

use crate::database::{Database, map_tr_err};

fn product_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Product> {
    Ok(Product {
        id: ProductId(row.get(0)?),
        name: row.get(1)?,
        views: row.get(2)?,
    })
}

/// Insert a product with a zero view counter.
pub async fn create_product(db: &Database, id: ProductId, name: &str) -> Result<(), TallyError> {
    let name = name.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO products (id, name, views) VALUES (?1, ?2, 0)",
                params![id.0, name],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get a product by ID.
pub async fn get_product(db: &Database, id: ProductId) -> Result<Option<Product>, TallyError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT id, name, views FROM products WHERE id = ?1",
                params![id.0],
                product_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// List all products ordered by ID.
pub async fn list_products(db: &Database) -> Result<Vec<Product>, TallyError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare("SELECT id, name, views FROM products ORDER BY id")?;
            let rows = stmt.query_map([], product_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

/// Sum of every product's view counter.
pub async fn total_views(db: &Database) -> Result<i64, TallyError> {
    db.connection()
        .call(|conn| {
            conn.query_row("SELECT COALESCE(SUM(views), 0) FROM products", [], |row| {
                row.get(0)
            })
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_and_get_product() {
        let db = Database::open_in_memory().await.unwrap();
        create_product(&db, ProductId(3), "kettle").await.unwrap();

        let product = get_product(&db, ProductId(3)).await.unwrap().unwrap();
        assert_eq!(product.name, "kettle");
        assert_eq!(product.views, 0);
    }

    #[tokio::test]
    async fn get_nonexistent_product_returns_none() {
        let db = Database::open_in_memory().await.unwrap();
        assert!(get_product(&db, ProductId(1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_product_id_is_an_error() {
        let db = Database::open_in_memory().await.unwrap();
        create_product(&db, ProductId(1), "a").await.unwrap();
        let err = create_product(&db, ProductId(1), "b").await.unwrap_err();
        assert!(matches!(err, TallyError::Storage { .. }));
    }

    #[tokio::test]
    async fn list_and_total() {
        let db = Database::open_in_memory().await.unwrap();
        assert_eq!(total_views(&db).await.unwrap(), 0);

        create_product(&db, ProductId(5), "toaster").await.unwrap();
        create_product(&db, ProductId(3), "kettle").await.unwrap();

        let ids: Vec<i64> = list_products(&db)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id.0)
            .collect();
        assert_eq!(ids, vec![3, 5]);
        assert_eq!(total_views(&db).await.unwrap(), 0);
    }
}
