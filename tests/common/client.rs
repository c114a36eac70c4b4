//! HTTP client for end-to-end tests
//!
//! Wraps reqwest with one method per control endpoint. When routes or
//! request formats change, update only this file.

use super::constants::REQUEST_TIMEOUT_SECS;
use reqwest::Response;
use serde_json::json;
use std::time::Duration;

pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    pub async fn home(&self) -> Response {
        self.client
            .get(format!("{}/", self.base_url))
            .send()
            .await
            .expect("Request failed")
    }

    pub async fn run_import(&self) -> Response {
        self.client
            .post(format!("{}/v1/import/run", self.base_url))
            .send()
            .await
            .expect("Request failed")
    }

    pub async fn reset_data(&self) -> Response {
        self.client
            .post(format!("{}/v1/import/reset", self.base_url))
            .send()
            .await
            .expect("Request failed")
    }

    pub async fn get_status(&self) -> serde_json::Value {
        let response = self
            .client
            .get(format!("{}/v1/import/status", self.base_url))
            .send()
            .await
            .expect("Request failed");
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        response.json().await.expect("Status was not valid JSON")
    }

    pub async fn clear_status(&self) -> Response {
        self.client
            .delete(format!("{}/v1/import/status", self.base_url))
            .send()
            .await
            .expect("Request failed")
    }

    pub async fn trigger(&self, process_id: &str, token: &str) -> Response {
        self.client
            .post(format!("{}/v1/trigger/{}", self.base_url, process_id))
            .json(&json!({ "token": token }))
            .send()
            .await
            .expect("Request failed")
    }

    /// Polls the status endpoint until `predicate` holds or a 5 second
    /// deadline passes. Returns the matching snapshot.
    ///
    /// # Panics
    ///
    /// Panics on timeout, printing the last snapshot seen.
    pub async fn wait_for_status<F>(&self, predicate: F) -> serde_json::Value
    where
        F: Fn(&serde_json::Value) -> bool,
    {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            let status = self.get_status().await;
            if predicate(&status) {
                return status;
            }
            if tokio::time::Instant::now() > deadline {
                panic!("Timed out waiting for status, last snapshot: {status}");
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
    }
}
