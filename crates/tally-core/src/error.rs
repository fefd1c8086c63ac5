// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for Tally.
//!
//! The three transactional variants (`TransactionStart`, `Statement`, `Commit`)
//! carry the engine's error untouched as `source`. Callers that need the
//! engine diagnostic can downcast it.

use thiserror::Error;

use crate::types::Statement;

/// Boxed engine error carried by [`TallyError`] variants.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The primary error type used across Tally crates.
#[derive(Debug, Error)]
pub enum TallyError {
    /// The engine could not begin a transaction. Nothing was written.
    #[error("failed to begin transaction: {source}")]
    TransactionStart { source: BoxError },

    /// A write inside the transaction was rejected. The transaction was
    /// rolled back before this error was returned.
    #[error("{statement} statement failed: {source}")]
    Statement {
        statement: Statement,
        source: BoxError,
    },

    /// Both writes succeeded but the engine rejected the commit.
    #[error("failed to commit transaction: {source}")]
    Commit { source: BoxError },

    /// Storage plumbing errors outside the recorded transaction
    /// (opening the database, PRAGMAs, reads, closed connection).
    #[error("storage error: {source}")]
    Storage { source: BoxError },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl TallyError {
    pub fn transaction_start<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::TransactionStart {
            source: Box::new(err),
        }
    }

    pub fn statement<E>(statement: Statement, err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Statement {
            statement,
            source: Box::new(err),
        }
    }

    pub fn commit<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Commit {
            source: Box::new(err),
        }
    }

    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage {
            source: Box::new(err),
        }
    }

    /// Returns the engine error this variant wraps, if any.
    pub fn engine_source(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            Self::TransactionStart { source }
            | Self::Statement { source, .. }
            | Self::Commit { source }
            | Self::Storage { source } => Some(source.as_ref()),
            Self::Internal(_) => None,
        }
    }
}
