// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Tally.
//!
//! - [`ScriptedConnection`] - a transactional connection driven by an ordered
//!   list of expectations, for exercising every begin/execute/commit/rollback
//!   path without a real database.

pub mod scripted;

pub use scripted::{Call, Expectation, ScriptError, ScriptedConnection, ScriptedTransaction};
