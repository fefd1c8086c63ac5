// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read and seed queries over products and viewer events.

pub mod products;
pub mod viewers;
