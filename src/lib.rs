//! Casino Sync Server Library
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod background;
pub mod config;
pub mod content;
pub mod jobs;
pub mod kv_store;
pub mod satellite;
pub mod server;
pub mod sqlite_support;

// Re-export commonly used types for convenience
pub use background::{
    BackgroundProcess, ChannelDispatcher, ContinuationRunner, ProcessConfig, ProcessRegistry,
    TriggerAuth,
};
pub use content::{ContentStore, EntityKind, SqliteContentStore};
pub use jobs::Pipeline;
pub use kv_store::{KvStore, SqliteKvStore};
pub use satellite::HttpCatalogApi;
pub use server::{run_server, RequestsLoggingLevel};
