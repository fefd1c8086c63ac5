// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for Tally.
//!
//! Provides the error taxonomy, identifier types and adapter traits shared by
//! the storage backend, the test utilities and the CLI.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{BoxError, TallyError};
pub use types::{HealthStatus, Product, ProductId, Statement, UserId, ViewerEvent};

pub use traits::{PluginAdapter, StatsStore};
