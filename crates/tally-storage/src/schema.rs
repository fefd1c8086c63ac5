// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Schema bootstrap.
//!
//! Creates the two tables the recorder writes to when they are missing.
//! Existing tables are left untouched; there is no versioning.

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS products (
    id    INTEGER PRIMARY KEY,
    name  TEXT NOT NULL DEFAULT '',
    views INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS product_viewers (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id    INTEGER NOT NULL,
    product_id INTEGER NOT NULL REFERENCES products(id),
    viewed_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);

CREATE INDEX IF NOT EXISTS idx_product_viewers_product
    ON product_viewers(product_id);
";

/// Create the `products` and `product_viewers` tables if they do not exist.
pub fn bootstrap(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)
}
