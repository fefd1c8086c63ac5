// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for view-stats backends.

use async_trait::async_trait;

use crate::error::TallyError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Product, ProductId, UserId, ViewerEvent};

/// Adapter for backends that record product views.
///
/// `record_view` is all-or-nothing: either the view counter increment and the
/// viewer event are both persisted, or neither is.
#[async_trait]
pub trait StatsStore: PluginAdapter {
    /// Opens the backend and bootstraps its schema.
    async fn initialize(&self) -> Result<(), TallyError>;

    /// Flushes pending writes and releases the connection.
    async fn close(&self) -> Result<(), TallyError>;

    /// Increments the view counter and appends a viewer event in one transaction.
    async fn record_view(&self, user_id: UserId, product_id: ProductId)
    -> Result<(), TallyError>;

    /// Fetches a product with its current view counter.
    async fn product(&self, id: ProductId) -> Result<Option<Product>, TallyError>;

    /// Lists every product ordered by id.
    async fn products(&self) -> Result<Vec<Product>, TallyError>;

    /// Lists viewer events recorded for a product, oldest first.
    async fn viewers(&self, id: ProductId) -> Result<Vec<ViewerEvent>, TallyError>;
}
