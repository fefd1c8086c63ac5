// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted transactional connection.
//!
//! Each call made through a [`ScriptedConnection`] (or a transaction it began)
//! is checked against the next queued [`Expectation`]. A match yields the
//! expectation's scripted outcome; a mismatch or an unscripted call is recorded
//! as a violation and surfaces as [`ScriptError::Unexpected`].

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use regex::Regex;
use tally_storage::{StatsTransaction, TransactionalConnection};
use thiserror::Error;

/// Errors returned by scripted operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    /// An error injected by an expectation via [`Expectation::failing`].
    #[error("{0}")]
    Injected(String),

    /// The call did not match the next expectation, or none was left.
    #[error("unexpected call: {0}")]
    Unexpected(String),
}

/// A call observed by the scripted connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Begin,
    Exec { sql: String, args: Vec<i64> },
    Commit,
    Rollback,
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Begin => f.write_str("begin"),
            Self::Exec { sql, args } => write!(f, "exec `{sql}` with {args:?}"),
            Self::Commit => f.write_str("commit"),
            Self::Rollback => f.write_str("rollback"),
        }
    }
}

#[derive(Debug)]
enum ExpectKind {
    Begin,
    Exec {
        pattern: Regex,
        args: Option<Vec<i64>>,
    },
    Commit,
    Rollback,
}

/// One expected call and its scripted outcome.
#[derive(Debug)]
pub struct Expectation {
    kind: ExpectKind,
    outcome: Result<usize, String>,
}

impl Expectation {
    fn new(kind: ExpectKind) -> Self {
        Self {
            kind,
            outcome: Ok(0),
        }
    }

    /// Expect a transaction to begin.
    pub fn begin() -> Self {
        Self::new(ExpectKind::Begin)
    }

    /// Expect a statement whose SQL matches the regex `pattern`.
    ///
    /// # Panics
    ///
    /// Panics if `pattern` is not a valid regex.
    pub fn exec(pattern: &str) -> Self {
        let pattern = Regex::new(pattern)
            .unwrap_or_else(|e| panic!("invalid statement pattern `{pattern}`: {e}"));
        Self::new(ExpectKind::Exec {
            pattern,
            args: None,
        })
    }

    /// Expect a commit.
    pub fn commit() -> Self {
        Self::new(ExpectKind::Commit)
    }

    /// Expect a rollback.
    pub fn rollback() -> Self {
        Self::new(ExpectKind::Rollback)
    }

    /// Require the statement's parameters to equal `args`.
    pub fn with_args(mut self, args: &[i64]) -> Self {
        if let ExpectKind::Exec { args: expected, .. } = &mut self.kind {
            *expected = Some(args.to_vec());
        }
        self
    }

    /// Report `rows` affected rows when the statement runs.
    pub fn returning_rows(mut self, rows: usize) -> Self {
        self.outcome = Ok(rows);
        self
    }

    /// Fail the call with [`ScriptError::Injected`] carrying `message`.
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.outcome = Err(message.into());
        self
    }

    fn matches(&self, call: &Call) -> bool {
        match (&self.kind, call) {
            (ExpectKind::Begin, Call::Begin)
            | (ExpectKind::Commit, Call::Commit)
            | (ExpectKind::Rollback, Call::Rollback) => true,
            (ExpectKind::Exec { pattern, args }, Call::Exec { sql, args: actual }) => {
                pattern.is_match(sql) && args.as_ref().is_none_or(|expected| expected == actual)
            }
            _ => false,
        }
    }
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExpectKind::Begin => f.write_str("begin"),
            ExpectKind::Exec { pattern, args } => match args {
                Some(args) => write!(f, "exec matching `{pattern}` with {args:?}"),
                None => write!(f, "exec matching `{pattern}`"),
            },
            ExpectKind::Commit => f.write_str("commit"),
            ExpectKind::Rollback => f.write_str("rollback"),
        }
    }
}

#[derive(Debug, Default)]
struct Script {
    expected: VecDeque<Expectation>,
    calls: Vec<Call>,
    violations: Vec<String>,
}

/// A fake database handle whose behavior is scripted up front.
///
/// Clones share the same script, so a test can hand one clone to the code
/// under test and inspect the other afterwards.
#[derive(Debug, Clone, Default)]
pub struct ScriptedConnection {
    script: Arc<Mutex<Script>>,
}

impl ScriptedConnection {
    /// Create a connection with no expectations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an expectation after the ones already queued.
    pub fn expect(&self, expectation: Expectation) -> &Self {
        self.lock().expected.push_back(expectation);
        self
    }

    /// Every call observed so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Number of observed calls equal to `call`.
    pub fn count(&self, call: &Call) -> usize {
        self.lock().calls.iter().filter(|c| *c == call).count()
    }

    /// Number of observed statements (of any SQL).
    pub fn exec_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| matches!(c, Call::Exec { .. }))
            .count()
    }

    /// Ok if every expectation was consumed in order and nothing unexpected
    /// happened; otherwise a description of what went wrong.
    pub fn expectations_were_met(&self) -> Result<(), String> {
        let script = self.lock();
        let mut problems = script.violations.clone();
        if !script.expected.is_empty() {
            let remaining: Vec<String> = script.expected.iter().map(|e| e.to_string()).collect();
            problems.push(format!(
                "there were unfulfilled expectations: {}",
                remaining.join(", ")
            ));
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems.join("; "))
        }
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take(&self, call: Call) -> Result<usize, ScriptError> {
        let mut script = self.lock();
        script.calls.push(call.clone());

        let Some(next) = script.expected.pop_front() else {
            let message = format!("{call}: no expectations left");
            script.violations.push(message.clone());
            return Err(ScriptError::Unexpected(message));
        };

        if next.matches(&call) {
            next.outcome.map_err(ScriptError::Injected)
        } else {
            let message = format!("{call}: expected {next}");
            script.violations.push(message.clone());
            script.expected.push_front(next);
            Err(ScriptError::Unexpected(message))
        }
    }
}

impl TransactionalConnection for ScriptedConnection {
    type Error = ScriptError;
    type Transaction<'tx> = ScriptedTransaction;

    fn begin(&mut self) -> Result<Self::Transaction<'_>, Self::Error> {
        self.take(Call::Begin)?;
        Ok(ScriptedTransaction { conn: self.clone() })
    }
}

/// A transaction begun on a [`ScriptedConnection`].
#[derive(Debug)]
pub struct ScriptedTransaction {
    conn: ScriptedConnection,
}

impl StatsTransaction for ScriptedTransaction {
    type Error = ScriptError;

    fn execute(&mut self, sql: &str, params: &[i64]) -> Result<usize, Self::Error> {
        self.conn.take(Call::Exec {
            sql: sql.to_string(),
            args: params.to_vec(),
        })
    }

    fn commit(self) -> Result<(), Self::Error> {
        self.conn.take(Call::Commit).map(|_| ())
    }

    fn rollback(self) -> Result<(), Self::Error> {
        self.conn.take(Call::Rollback).map(|_| ())
    }
}
