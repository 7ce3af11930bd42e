// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resource endpoints, as methods on [`crate::ApiClient`].
//!
//! Entities (shops, products, orders) are passed through as JSON. Only the
//! dashboard read models are typed, because they need zero-valued defaults.

mod analytics;
mod orders;
mod products;
mod shops;

pub use analytics::{Metric, ProductStats, RatingStats, ShopAnalytics, TodayStats};
pub use orders::OrderFilters;
pub use shops::ShopQuery;

#[cfg(test)]
#[path = "api_tests.rs"]
mod tests;
