// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dashboard reads. These never fail: any error degrades to an empty
//! default so a dashboard can render for a shop with no data yet.

use std::collections::BTreeMap;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::ApiClient;
use crate::fallback::with_default;
use crate::gateway::RequestOptions;

/// A current/previous pair with the relative change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metric {
    pub current: f64,
    pub previous: f64,
    pub change: f64,
}

/// Shop owner analytics for a period.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShopAnalytics {
    pub revenue: Metric,
    pub orders: Metric,
    pub customers: Metric,
    #[serde(alias = "conversionRate")]
    pub conversion_rate: Metric,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TodayStats {
    pub today_sales: f64,
    pub today_orders: u64,
    pub sales_change: f64,
    pub total_products: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductStats {
    pub total_products: u64,
    pub active_products: u64,
    pub low_stock_products: u64,
    pub out_of_stock_products: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingStats {
    pub average_rating: f64,
    pub total_reviews: u64,
    /// Review count per star value.
    pub rating_distribution: BTreeMap<String, u64>,
}

impl ApiClient {
    /// GET `endpoint`, degrading to `default` on any error.
    async fn dashboard_read<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
        default: T,
    ) -> T {
        with_default(self.fetch(Method::GET, endpoint, options, true), default).await
    }

    pub async fn shop_owner_analytics(&self, period: &str) -> ShopAnalytics {
        let options = RequestOptions::new().query("period", period);
        self.dashboard_read("/shop-owner/analytics", options, ShopAnalytics::default()).await
    }

    pub async fn today_stats(&self) -> TodayStats {
        self.dashboard_read("/shop-owner/stats/today", RequestOptions::new(), TodayStats::default())
            .await
    }

    pub async fn my_product_stats(&self) -> ProductStats {
        self.dashboard_read("/products/my-stats", RequestOptions::new(), ProductStats::default())
            .await
    }

    pub async fn my_shop_rating_stats(&self) -> RatingStats {
        self.dashboard_read("/ratings/my-shop/stats", RequestOptions::new(), RatingStats::default())
            .await
    }

    pub async fn low_stock_products(&self) -> Vec<Value> {
        self.dashboard_read("/shop-owner/products/low-stock", RequestOptions::new(), Vec::new())
            .await
    }

    /// Admin dashboard overview; an empty object when unavailable.
    pub async fn dashboard_overview(&self) -> Value {
        let empty = Value::Object(Default::default());
        self.dashboard_read("/admin/dashboard/overview", RequestOptions::new(), empty).await
    }

    pub async fn recommendations(&self, limit: u32) -> Vec<Value> {
        let options = RequestOptions::new().query("limit", limit);
        self.dashboard_read("/products/recommendations", options, Vec::new()).await
    }
}
