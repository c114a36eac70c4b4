//! Payload types for the satellite catalog API.

use serde::Deserialize;
use serde_json::Value as JsonValue;

/// One page of catalog records.
///
/// Records stay raw JSON objects here; field mapping happens later against a
/// [`FieldTable`](crate::content::FieldTable).
#[derive(Debug, Clone, Deserialize)]
pub struct PageResponse {
    #[serde(default)]
    pub data: Vec<JsonValue>,
}

/// Optional listing refinements forwarded as query parameters.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    /// Field/value pairs sent as `filters[field]=value`.
    pub filters: Vec<(String, String)>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl ListQuery {
    pub(super) fn query_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        for (field, value) in &self.filters {
            params.push((format!("filters[{field}]"), value.clone()));
        }
        if let Some(sort_by) = &self.sort_by {
            params.push(("sort_by".to_string(), sort_by.clone()));
        }
        if let Some(sort_order) = &self.sort_order {
            params.push(("sort_order".to_string(), sort_order.clone()));
        }
        params
    }
}
