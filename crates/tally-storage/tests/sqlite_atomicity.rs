// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Atomicity and non-idempotence of `record_stats` against real SQLite.

use proptest::prelude::*;
use rusqlite::Connection;
use tally_core::{ProductId, Statement, TallyError, UserId};
use tally_storage::{record_stats, schema};

fn seeded(products: &[i64]) -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
    schema::bootstrap(&conn).unwrap();
    for id in products {
        conn.execute("INSERT INTO products (id) VALUES (?1)", [id])
            .unwrap();
    }
    conn
}

fn views(conn: &Connection) -> Vec<i64> {
    let mut stmt = conn.prepare("SELECT views FROM products ORDER BY id").unwrap();
    stmt.query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap()
}

fn events(conn: &Connection) -> Vec<(i64, i64)> {
    let mut stmt = conn
        .prepare("SELECT user_id, product_id FROM product_viewers ORDER BY id")
        .unwrap();
    stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap()
}

#[test]
fn unique_viewer_constraint_failure_leaves_no_partial_state() {
    let mut conn = seeded(&[3]);
    conn.execute_batch(
        "CREATE UNIQUE INDEX one_view_per_user ON product_viewers(user_id, product_id);",
    )
    .unwrap();

    record_stats(&mut conn, UserId(2), ProductId(3)).unwrap();
    let err = record_stats(&mut conn, UserId(2), ProductId(3)).unwrap_err();

    assert!(matches!(
        err,
        TallyError::Statement {
            statement: Statement::InsertViewer,
            ..
        }
    ));
    let source = err
        .engine_source()
        .and_then(|e| e.downcast_ref::<rusqlite::Error>())
        .expect("engine error should be a rusqlite::Error");
    assert_eq!(
        source.sqlite_error_code(),
        Some(rusqlite::ErrorCode::ConstraintViolation)
    );
    assert_eq!(views(&conn), vec![1]);
    assert_eq!(events(&conn), vec![(2, 3)]);
}

#[test]
fn increment_runs_against_an_empty_products_table() {
    // Zero rows updated is still a successful statement; the insert then
    // fails on the foreign key and nothing is kept.
    let mut conn = seeded(&[]);
    let err = record_stats(&mut conn, UserId(1), ProductId(5)).unwrap_err();
    assert!(matches!(err, TallyError::Statement { .. }));
    assert!(events(&conn).is_empty());
}

#[test]
fn begin_inside_open_transaction_is_a_start_error() {
    let mut conn = seeded(&[3]);
    conn.execute_batch("BEGIN;").unwrap();

    // rusqlite's transaction() issues BEGIN DEFERRED, which SQLite rejects
    // while another transaction is open.
    let err = record_stats(&mut conn, UserId(2), ProductId(3)).unwrap_err();
    assert!(matches!(err, TallyError::TransactionStart { .. }));

    conn.execute_batch("ROLLBACK;").unwrap();
    assert_eq!(views(&conn), vec![0]);
}

#[test]
fn commit_failure_is_rolled_back_by_the_driver() {
    // A deferred foreign key is only checked at COMMIT, so both writes
    // succeed and the commit itself fails.
    let mut conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;
         CREATE TABLE products (id INTEGER PRIMARY KEY, views INTEGER NOT NULL DEFAULT 0);
         CREATE TABLE product_viewers (
             id INTEGER PRIMARY KEY,
             user_id INTEGER NOT NULL,
             product_id INTEGER NOT NULL
                 REFERENCES products(id) DEFERRABLE INITIALLY DEFERRED
         );
         INSERT INTO products (id) VALUES (3);",
    )
    .unwrap();

    let err = record_stats(&mut conn, UserId(2), ProductId(99)).unwrap_err();

    assert!(matches!(err, TallyError::Commit { .. }));
    assert!(conn.is_autocommit(), "no transaction may be left open");
    assert_eq!(views(&conn), vec![0]);
    assert!(events(&conn).is_empty());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Repeating the same call is not deduplicated: every call adds one to each
    /// counter and appends one event.
    #[test]
    fn repeated_calls_accumulate(user in any::<i64>(), calls in 1usize..6) {
        let mut conn = seeded(&[1, 2]);

        for _ in 0..calls {
            record_stats(&mut conn, UserId(user), ProductId(1)).unwrap();
        }

        let n = calls as i64;
        prop_assert_eq!(views(&conn), vec![n, n]);
        prop_assert_eq!(events(&conn), vec![(user, 1); calls]);
    }

    /// A view for a product that does not exist never leaves a counter bumped.
    #[test]
    fn failed_insert_never_commits_increment(
        product in any::<i64>().prop_filter("must not exist", |p| *p != 1),
        prior in 0usize..3,
    ) {
        let mut conn = seeded(&[1]);
        for _ in 0..prior {
            record_stats(&mut conn, UserId(9), ProductId(1)).unwrap();
        }

        let result = record_stats(&mut conn, UserId(9), ProductId(product));

        prop_assert!(result.is_err());
        prop_assert_eq!(views(&conn), vec![prior as i64]);
        prop_assert_eq!(events(&conn).len(), prior);
    }
}
