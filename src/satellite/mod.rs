//! Client for the remote satellite catalog that serves brand and slot
//! records.

mod client;
mod models;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::content::EntityKind;

pub use client::HttpCatalogApi;
pub use models::{ListQuery, PageResponse};

/// Read access to the remote catalog.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Fetch the lightweight id/name listing covering every record of `kind`.
    async fn get_options(&self, kind: EntityKind, query: &ListQuery) -> Result<Vec<JsonValue>>;

    /// Fetch one page of full records of `kind`.
    async fn get_page(
        &self,
        kind: EntityKind,
        page: u32,
        per_page: u32,
        query: &ListQuery,
    ) -> Result<PageResponse>;
}
