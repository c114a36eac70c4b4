//! Durable queue state for a single background process.
//!
//! Everything a process persists lives under its identifier in the key/value
//! store: batch rows, the drain lock and the cancel/pause flag. Batches are
//! drained oldest-first; rewriting a batch in place keeps its queue position.

use crate::background::models::{Batch, ProcessFlag, ProcessLock, WorkItem};
use crate::kv_store::KvStore;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

const BATCH_INFIX: &str = "_batch_";
const LOCK_SUFFIX: &str = "_process_lock";
// "_status" alone would collide with the job status records, which callers
// key as "<entity>_<stage>_status".
const FLAG_SUFFIX: &str = "_process_status";

fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

#[derive(Clone)]
pub struct ProcessQueue {
    store: Arc<dyn KvStore>,
    process_id: String,
}

impl ProcessQueue {
    pub fn new(store: Arc<dyn KvStore>, process_id: &str) -> Self {
        ProcessQueue {
            store,
            process_id: process_id.to_string(),
        }
    }

    pub fn process_id(&self) -> &str {
        &self.process_id
    }

    fn batch_prefix(&self) -> String {
        format!("{}{}", self.process_id, BATCH_INFIX)
    }

    fn lock_key(&self) -> String {
        format!("{}{}", self.process_id, LOCK_SUFFIX)
    }

    fn flag_key(&self) -> String {
        format!("{}{}", self.process_id, FLAG_SUFFIX)
    }

    /// Persists the items as a new batch at the tail of the queue and
    /// returns its key.
    pub fn save_new_batch(&self, items: &[WorkItem]) -> Result<String> {
        let key = format!("{}{}", self.batch_prefix(), Uuid::new_v4().simple());
        let value = serde_json::to_string(items)?;
        self.store.set(&key, &value)?;
        Ok(key)
    }

    /// Returns the oldest batch, or `None` when the queue is empty.
    pub fn first_batch(&self) -> Result<Option<Batch>> {
        let keys = self.store.keys_with_prefix(&self.batch_prefix())?;
        let Some(key) = keys.into_iter().next() else {
            return Ok(None);
        };
        let Some(value) = self.store.get(&key)? else {
            return Ok(None);
        };
        let items: Vec<WorkItem> = serde_json::from_str(&value)
            .with_context(|| format!("corrupt batch payload under {key}"))?;
        Ok(Some(Batch { key, items }))
    }

    /// Rewrites a batch in place. The row keeps its queue position.
    pub fn update_batch(&self, batch: &Batch) -> Result<()> {
        let value = serde_json::to_string(&batch.items)?;
        self.store.set(&batch.key, &value)
    }

    pub fn delete_batch(&self, key: &str) -> Result<()> {
        self.store.delete(key)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.batch_count()? == 0)
    }

    pub fn batch_count(&self) -> Result<usize> {
        Ok(self.store.keys_with_prefix(&self.batch_prefix())?.len())
    }

    pub fn delete_all_batches(&self) -> Result<()> {
        for key in self.store.keys_with_prefix(&self.batch_prefix())? {
            self.store.delete(&key)?;
        }
        Ok(())
    }

    /// Attempts to acquire the drain lock via compare-and-swap. Returns
    /// `false` when another holder has a non-expired lock. An expired or
    /// unreadable lock row is taken over.
    pub fn try_lock(&self, ttl: Duration) -> Result<bool> {
        let key = self.lock_key();
        let fresh = serde_json::to_string(&ProcessLock {
            acquired_at: now_secs(),
            ttl_secs: ttl.as_secs(),
        })?;
        match self.store.get(&key)? {
            None => self.store.compare_and_swap(&key, None, &fresh),
            Some(current) => {
                let held = serde_json::from_str::<ProcessLock>(&current)
                    .map(|lock| !lock.is_expired(now_secs()))
                    .unwrap_or(false);
                if held {
                    return Ok(false);
                }
                self.store.compare_and_swap(&key, Some(&current), &fresh)
            }
        }
    }

    pub fn is_locked(&self) -> Result<bool> {
        let Some(value) = self.store.get(&self.lock_key())? else {
            return Ok(false);
        };
        Ok(serde_json::from_str::<ProcessLock>(&value)
            .map(|lock| !lock.is_expired(now_secs()))
            .unwrap_or(false))
    }

    pub fn unlock(&self) -> Result<()> {
        self.store.delete(&self.lock_key())
    }

    pub fn set_flag(&self, flag: ProcessFlag) -> Result<()> {
        self.store.set(&self.flag_key(), flag.as_str())
    }

    pub fn flag(&self) -> Result<Option<ProcessFlag>> {
        Ok(self
            .store
            .get(&self.flag_key())?
            .and_then(|value| ProcessFlag::from_str(&value)))
    }

    pub fn clear_flag(&self) -> Result<()> {
        self.store.delete(&self.flag_key())
    }
}
