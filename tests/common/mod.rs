//! Common test infrastructure
//!
//! This module provides all the infrastructure needed for end-to-end tests.
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{TestClient, TestServer};
//!
//! #[tokio::test]
//! async fn test_import_completes() {
//!     let server = TestServer::spawn().await;
//!     let client = TestClient::new(server.base_url.clone());
//!
//!     client.run_import().await;
//!     client
//!         .wait_for_status(|s| s["brandImport"]["status"] == "completed")
//!         .await;
//! }
//! ```

#![allow(dead_code)]

mod client;
mod constants;
mod server;

// Public API - this is what tests import
pub use client::TestClient;
pub use constants::*;
pub use server::{wait_until, ScriptedCatalog, TestServer};
