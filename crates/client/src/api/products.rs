// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use reqwest::Method;
use serde_json::{json, Value};

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::gateway::RequestOptions;

impl ApiClient {
    pub async fn create_product(&self, product: Value) -> Result<Value, ApiError> {
        self.fetch(Method::POST, "/products/", RequestOptions::new().json(product), true).await
    }

    /// Products of the caller's shop.
    pub async fn my_products(
        &self,
        skip: u32,
        limit: u32,
        active_only: bool,
    ) -> Result<Value, ApiError> {
        let options = RequestOptions::new()
            .query("skip", skip)
            .query("limit", limit)
            .query("active_only", active_only);
        self.fetch(Method::GET, "/products/my-products", options, true).await
    }

    pub async fn product(&self, product_id: u64) -> Result<Value, ApiError> {
        let endpoint = format!("/products/{product_id}");
        self.fetch(Method::GET, &endpoint, RequestOptions::new(), false).await
    }

    /// Public catalogue.
    pub async fn list_products(
        &self,
        skip: u32,
        limit: u32,
        active_only: bool,
        search: Option<&str>,
    ) -> Result<Value, ApiError> {
        let mut options = RequestOptions::new()
            .query("skip", skip)
            .query("limit", limit)
            .query("active_only", active_only);
        if let Some(search) = search.filter(|s| !s.is_empty()) {
            options = options.query("search", search);
        }
        self.fetch(Method::GET, "/products/", options, false).await
    }

    pub async fn update_product(&self, product_id: u64, product: Value) -> Result<Value, ApiError> {
        let endpoint = format!("/products/{product_id}");
        self.fetch(Method::PUT, &endpoint, RequestOptions::new().json(product), true).await
    }

    pub async fn delete_product(&self, product_id: u64) -> Result<(), ApiError> {
        self.delete(&format!("/products/{product_id}"), RequestOptions::new(), true).await?;
        Ok(())
    }

    /// Adjust stock by a signed delta.
    pub async fn update_product_stock(
        &self,
        product_id: u64,
        quantity_change: i64,
    ) -> Result<Value, ApiError> {
        let endpoint = format!("/products/{product_id}/stock");
        let options = RequestOptions::new().json(json!({ "quantity_change": quantity_change }));
        self.fetch(Method::PATCH, &endpoint, options, true).await
    }
}
