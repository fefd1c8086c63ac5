// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transactional view recording.
//!
//! One call increments the aggregate view counter and appends a viewer event
//! inside a single transaction. Either both writes are committed or the
//! transaction is rolled back.

use tally_core::{ProductId, Statement, TallyError, UserId};
use tracing::{debug, warn};

use crate::transaction::{StatsTransaction, TransactionalConnection};

/// Increments `views` on every row of `products`.
///
/// There is no `WHERE id = ?` filter. This matches the existing schema
/// contract and is kept as-is; see DESIGN.md before scoping it to a product.
pub const INCREMENT_VIEWS_SQL: &str = "UPDATE products SET views = views + 1";

/// Appends one viewer event.
pub const INSERT_VIEWER_SQL: &str =
    "INSERT INTO product_viewers (user_id, product_id) VALUES (?, ?)";

/// Record that `user_id` viewed `product_id`.
///
/// Errors:
/// - [`TallyError::TransactionStart`] if the transaction cannot begin. Nothing
///   else is attempted.
/// - [`TallyError::Statement`] if either write fails. The transaction is rolled
///   back first. A failing rollback is logged and dropped so the caller sees
///   the statement error that caused it.
/// - [`TallyError::Commit`] if the engine rejects the commit. No explicit
///   rollback is issued on this path; for rusqlite, dropping the failed
///   `Transaction` rolls it back, which is what keeps both writes out.
///
/// No retries happen here. Calling twice records two views.
pub fn record_stats<C>(
    conn: &mut C,
    user_id: UserId,
    product_id: ProductId,
) -> Result<(), TallyError>
where
    C: TransactionalConnection,
{
    let mut tx = conn.begin().map_err(TallyError::transaction_start)?;
    debug!(%user_id, %product_id, "transaction started");

    match apply(&mut tx, user_id, product_id) {
        Ok(()) => {
            tx.commit().map_err(TallyError::commit)?;
            debug!(%user_id, %product_id, "view recorded");
            Ok(())
        }
        Err(err) => {
            // Best-effort rollback: the statement error is what the caller gets.
            if let Err(rollback_err) = tx.rollback() {
                warn!(
                    error = %rollback_err,
                    cause = %err,
                    "rollback failed after statement error; reporting the statement error"
                );
            } else {
                debug!(error = %err, "transaction rolled back");
            }
            Err(err)
        }
    }
}

fn apply<T: StatsTransaction>(
    tx: &mut T,
    user_id: UserId,
    product_id: ProductId,
) -> Result<(), TallyError> {
    let updated = tx
        .execute(INCREMENT_VIEWS_SQL, &[])
        .map_err(|e| TallyError::statement(Statement::IncrementViews, e))?;
    debug!(rows = updated, "view counter incremented");

    tx.execute(INSERT_VIEWER_SQL, &[user_id.0, product_id.0])
        .map_err(|e| TallyError::statement(Statement::InsertViewer, e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema;

    fn seeded() -> rusqlite::Connection {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        schema::bootstrap(&conn).unwrap();
        conn.execute_batch(
            "INSERT INTO products (id, name) VALUES (3, 'kettle'), (5, 'toaster');",
        )
        .unwrap();
        conn
    }

    fn views(conn: &rusqlite::Connection) -> Vec<i64> {
        let mut stmt = conn.prepare("SELECT views FROM products ORDER BY id").unwrap();
        stmt.query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap()
    }

    fn events(conn: &rusqlite::Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM product_viewers", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn records_against_sqlite() {
        let mut conn = seeded();
        record_stats(&mut conn, UserId(2), ProductId(3)).unwrap();

        // The unscoped increment touches every product.
        assert_eq!(views(&conn), vec![1, 1]);
        let (user, product): (i64, i64) = conn
            .query_row(
                "SELECT user_id, product_id FROM product_viewers",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!((user, product), (2, 3));
    }

    #[test]
    fn foreign_key_failure_rolls_back_increment() {
        let mut conn = seeded();
        let err = record_stats(&mut conn, UserId(2), ProductId(404)).unwrap_err();

        assert!(matches!(
            err,
            TallyError::Statement {
                statement: Statement::InsertViewer,
                ..
            }
        ));
        assert_eq!(views(&conn), vec![0, 0]);
        assert_eq!(events(&conn), 0);
    }

    #[test]
    fn missing_products_table_fails_on_increment() {
        let mut conn = rusqlite::Connection::open_in_memory().unwrap();
        let err = record_stats(&mut conn, UserId(1), ProductId(5)).unwrap_err();
        assert!(matches!(
            err,
            TallyError::Statement {
                statement: Statement::IncrementViews,
                ..
            }
        ));
    }

    #[test]
    fn not_idempotent() {
        let mut conn = seeded();
        record_stats(&mut conn, UserId(1), ProductId(5)).unwrap();
        record_stats(&mut conn, UserId(1), ProductId(5)).unwrap();
        assert_eq!(views(&conn), vec![2, 2]);
        assert_eq!(events(&conn), 2);
    }
}
