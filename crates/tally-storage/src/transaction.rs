// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Minimal transactional connection seam.
//!
//! [`record_stats`](crate::record_stats) only needs begin, parameterized
//! execute, commit and rollback. Both `commit` and `rollback` consume the
//! transaction, so a transaction is resolved at most once.

/// A live database handle that can open transactions.
pub trait TransactionalConnection {
    /// Engine error reported by every operation.
    type Error: std::error::Error + Send + Sync + 'static;

    /// The transaction type, borrowing the connection for its lifetime.
    type Transaction<'tx>: StatsTransaction<Error = Self::Error> + 'tx
    where
        Self: 'tx;

    /// Begin a new transaction scoped to the returned value.
    fn begin(&mut self) -> Result<Self::Transaction<'_>, Self::Error>;
}

/// An open transaction.
pub trait StatsTransaction: Sized {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Execute one statement with positional integer parameters.
    /// Returns the number of affected rows.
    fn execute(&mut self, sql: &str, params: &[i64]) -> Result<usize, Self::Error>;

    /// Durably persist every statement executed so far.
    fn commit(self) -> Result<(), Self::Error>;

    /// Discard every statement executed so far.
    fn rollback(self) -> Result<(), Self::Error>;
}

impl TransactionalConnection for rusqlite::Connection {
    type Error = rusqlite::Error;
    type Transaction<'tx> = rusqlite::Transaction<'tx>;

    fn begin(&mut self) -> Result<Self::Transaction<'_>, Self::Error> {
        self.transaction()
    }
}

impl StatsTransaction for rusqlite::Transaction<'_> {
    type Error = rusqlite::Error;

    fn execute(&mut self, sql: &str, params: &[i64]) -> Result<usize, Self::Error> {
        // Call through Deref explicitly; `self.execute` would resolve to this method.
        rusqlite::Connection::execute(self, sql, rusqlite::params_from_iter(params.iter()))
    }

    fn commit(self) -> Result<(), Self::Error> {
        rusqlite::Transaction::commit(self)
    }

    fn rollback(self) -> Result<(), Self::Error> {
        rusqlite::Transaction::rollback(self)
    }
}
