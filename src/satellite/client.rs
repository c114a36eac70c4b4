//! HTTP client for the satellite catalog API.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::time::Duration;

use crate::content::EntityKind;

use super::models::{ListQuery, PageResponse};
use super::CatalogApi;

/// Header carrying the API key, when one is configured.
const API_KEY_HEADER: &str = "X-Satellite-Key";

/// HTTP client for communicating with the satellite catalog.
pub struct HttpCatalogApi {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpCatalogApi {
    /// Create a new catalog client.
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the satellite API (e.g., "https://satellite.example.com/api/v2")
    /// * `api_key` - Optional key sent as the `X-Satellite-Key` header
    /// * `timeout_sec` - Request timeout in seconds
    pub fn new(base_url: String, api_key: Option<String>, timeout_sec: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_sec))
            .build()
            .expect("Failed to create HTTP client");

        // Ensure base_url doesn't have trailing slash
        let base_url = base_url.trim_end_matches('/').to_string();

        Self {
            client,
            base_url,
            api_key,
        }
    }

    fn endpoint(kind: EntityKind) -> &'static str {
        match kind {
            EntityKind::Brand => "casino-brands",
            EntityKind::Slot => "slots",
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        params: &[(String, String)],
    ) -> Result<T> {
        let mut request = self.client.get(url).query(params);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }
        let response = request
            .send()
            .await
            .context("Failed to connect to satellite API")?;

        if !response.status().is_success() {
            anyhow::bail!(
                "Satellite request {} failed with status: {}",
                url,
                response.status()
            );
        }

        response
            .json()
            .await
            .context("Failed to parse satellite response")
    }

    /// Get the base URL of the satellite API.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl CatalogApi for HttpCatalogApi {
    async fn get_options(&self, kind: EntityKind, query: &ListQuery) -> Result<Vec<JsonValue>> {
        let url = format!("{}/{}/options", self.base_url, Self::endpoint(kind));
        self.get_json(&url, &query.query_params()).await
    }

    async fn get_page(
        &self,
        kind: EntityKind,
        page: u32,
        per_page: u32,
        query: &ListQuery,
    ) -> Result<PageResponse> {
        let url = format!("{}/{}", self.base_url, Self::endpoint(kind));
        let mut params = query.query_params();
        params.push(("page".to_string(), page.to_string()));
        params.push(("per_page".to_string(), per_page.to_string()));
        self.get_json(&url, &params).await
    }
}
