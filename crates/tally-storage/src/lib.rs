// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for Tally.
//!
//! The heart of the crate is [`record_stats`]: a view-counter increment and a
//! viewer-event insert committed together or not at all. It is generic over
//! [`TransactionalConnection`], implemented here for `rusqlite::Connection`.
//! Around it sit the single-writer [`Database`], read queries, and the async
//! [`SqliteStatsStore`] adapter.

pub mod adapter;
pub mod database;
pub mod queries;
pub mod recorder;
pub mod schema;
pub mod transaction;

pub use adapter::SqliteStatsStore;
pub use database::Database;
pub use recorder::{INCREMENT_VIEWS_SQL, INSERT_VIEWER_SQL, record_stats};
pub use transaction::{StatsTransaction, TransactionalConnection};
