// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use reqwest::Method;
use serde_json::{json, Value};

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::gateway::RequestOptions;

/// Filters for the shop owner's order list. Unset fields are not sent.
#[derive(Debug, Clone, Default)]
pub struct OrderFilters {
    pub status: Option<String>,
    pub search: Option<String>,
    pub skip: Option<u32>,
    pub limit: Option<u32>,
}

impl OrderFilters {
    fn options(&self) -> RequestOptions {
        let mut options = RequestOptions::new();
        if let Some(ref status) = self.status {
            options = options.query("status", status);
        }
        if let Some(ref search) = self.search {
            options = options.query("search", search);
        }
        if let Some(skip) = self.skip {
            options = options.query("skip", skip);
        }
        if let Some(limit) = self.limit {
            options = options.query("limit", limit);
        }
        options
    }
}

impl ApiClient {
    pub async fn shop_owner_orders(&self, filters: &OrderFilters) -> Result<Value, ApiError> {
        self.fetch(Method::GET, "/shop-owner/orders", filters.options(), true).await
    }

    pub async fn recent_orders(&self, limit: u32) -> Result<Value, ApiError> {
        let options = RequestOptions::new().query("limit", limit);
        self.fetch(Method::GET, "/shop-owner/orders/recent", options, true).await
    }

    pub async fn update_order_status(&self, order_id: u64, status: &str) -> Result<Value, ApiError> {
        let endpoint = format!("/shop-owner/orders/{order_id}/status");
        let options = RequestOptions::new().json(json!({ "status": status }));
        self.fetch(Method::PUT, &endpoint, options, true).await
    }
}
