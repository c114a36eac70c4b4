//! Key-value persistence for background-process state.
//!
//! Every piece of engine state lives here under a string key: queued
//! batches (`<process_id>_batch_<suffix>`), the drain lock
//! (`<process_id>_process_lock`), the cancel/pause flag
//! (`<process_id>_process_status`) and the polled job status records
//! (`<entity>_<stage>_status`). The store is injected, so tests can swap the
//! SQLite implementation for the in-memory one.

mod memory;
mod schema;
mod sqlite_kv_store;

pub use memory::MemoryKvStore;
pub use sqlite_kv_store::SqliteKvStore;

use anyhow::Result;

pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Insert or update. Updating an existing key keeps its original
    /// insertion-order slot.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a key. Deleting an absent key is not an error.
    fn delete(&self, key: &str) -> Result<()>;

    /// All keys starting with `prefix`, oldest insertion first.
    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;

    /// Atomic conditional write: store `new` under `key` only if the current
    /// value equals `expected` (`None` meaning the key is absent). Returns
    /// whether the swap happened.
    fn compare_and_swap(&self, key: &str, expected: Option<&str>, new: &str) -> Result<bool>;
}
