// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use reqwest::Method;
use serde_json::Value;

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::gateway::RequestOptions;

/// Paging and filters for the public shop listing.
#[derive(Debug, Clone)]
pub struct ShopQuery {
    /// 1-based page number.
    pub page: u32,
    pub limit: u32,
    pub search: Option<String>,
    pub category: Option<String>,
    pub sort: Option<String>,
    /// Extra filters, sent as repeated query pairs.
    pub filters: Vec<(String, String)>,
}

impl Default for ShopQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 20,
            search: None,
            category: None,
            sort: Some("relevance".to_owned()),
            filters: Vec::new(),
        }
    }
}

impl ShopQuery {
    fn options(&self) -> RequestOptions {
        let skip = self.page.saturating_sub(1).saturating_mul(self.limit);
        let mut options = RequestOptions::new().query("skip", skip).query("limit", self.limit);
        for (key, value) in [("search", &self.search), ("category", &self.category), ("sort", &self.sort)] {
            if let Some(v) = value.as_deref().filter(|v| !v.is_empty()) {
                options = options.query(key, v);
            }
        }
        for (key, value) in &self.filters {
            if !value.is_empty() {
                options = options.query(key, value);
            }
        }
        options
    }
}

impl ApiClient {
    pub async fn create_shop(&self, shop: Value) -> Result<Value, ApiError> {
        self.fetch(Method::POST, "/shops/create", RequestOptions::new().json(shop), true).await
    }

    /// The caller's own shop. A 404 means no shop has been created yet.
    pub async fn my_shop(&self) -> Result<Value, ApiError> {
        self.fetch(Method::GET, "/shops/my-shop", RequestOptions::new(), true).await
    }

    pub async fn update_my_shop(&self, shop: Value) -> Result<Value, ApiError> {
        self.fetch(Method::PUT, "/shops/my-shop", RequestOptions::new().json(shop), true).await
    }

    pub async fn delete_my_shop(&self) -> Result<(), ApiError> {
        self.delete("/shops/my-shop", RequestOptions::new(), true).await?;
        Ok(())
    }

    pub async fn shop(&self, shop_id: u64) -> Result<Value, ApiError> {
        self.fetch(Method::GET, &format!("/shops/{shop_id}"), RequestOptions::new(), false).await
    }

    pub async fn list_shops(&self, query: &ShopQuery) -> Result<Value, ApiError> {
        self.fetch(Method::GET, "/shops", query.options(), false).await
    }

    pub async fn featured_shops(&self) -> Result<Value, ApiError> {
        self.fetch(Method::GET, "/shops/featured", RequestOptions::new(), false).await
    }

    pub async fn follow_shop(&self, shop_id: u64) -> Result<Value, ApiError> {
        let endpoint = format!("/shops/{shop_id}/follow");
        self.fetch(Method::POST, &endpoint, RequestOptions::new(), true).await
    }

    pub async fn unfollow_shop(&self, shop_id: u64) -> Result<Value, ApiError> {
        let endpoint = format!("/shops/{shop_id}/unfollow");
        self.fetch(Method::DELETE, &endpoint, RequestOptions::new(), true).await
    }
}
