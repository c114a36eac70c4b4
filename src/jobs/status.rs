//! Per-stage job status records polled by the control surface.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::content::EntityKind;
use crate::kv_store::KvStore;

/// The two stages of an entity pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStage {
    Sync,
    Import,
}

impl JobStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStage::Sync => "sync",
            JobStage::Import => "import",
        }
    }

    pub fn all() -> [JobStage; 2] {
        [JobStage::Sync, JobStage::Import]
    }
}

/// Lifecycle state reported for a pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Idle,
    Queued,
    Running,
    Completed,
    Skipped,
}

/// Progress record for one pipeline stage. Each transition overwrites the
/// whole record, so only the fields meaningful for that state are present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatusRecord {
    pub status: JobState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent: Option<u8>,
}

impl JobStatusRecord {
    /// What callers see when no record has been written yet.
    pub fn idle() -> Self {
        JobStatusRecord {
            status: JobState::Idle,
            total: None,
            processed: None,
            percent: Some(0),
        }
    }

    pub fn queued() -> Self {
        JobStatusRecord {
            status: JobState::Queued,
            total: None,
            processed: None,
            percent: None,
        }
    }

    pub fn running(total: u64, processed: u64, percent: u8) -> Self {
        JobStatusRecord {
            status: JobState::Running,
            total: Some(total),
            processed: Some(processed),
            percent: Some(percent),
        }
    }

    pub fn completed() -> Self {
        JobStatusRecord {
            status: JobState::Completed,
            total: None,
            processed: None,
            percent: Some(100),
        }
    }

    /// Terminal record for an import that found nothing to page over.
    pub fn skipped() -> Self {
        JobStatusRecord {
            status: JobState::Skipped,
            total: None,
            processed: None,
            percent: None,
        }
    }
}

/// Read/write access to the status records, one per entity kind and stage.
#[derive(Clone)]
pub struct StatusStore {
    store: Arc<dyn KvStore>,
}

impl StatusStore {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        StatusStore { store }
    }

    fn key(kind: EntityKind, stage: JobStage) -> String {
        format!("{}_{}_status", kind.as_db_str(), stage.as_str())
    }

    pub fn set(&self, kind: EntityKind, stage: JobStage, record: &JobStatusRecord) -> Result<()> {
        let value = serde_json::to_string(record)?;
        self.store.set(&Self::key(kind, stage), &value)
    }

    pub fn get(&self, kind: EntityKind, stage: JobStage) -> Result<JobStatusRecord> {
        match self.store.get(&Self::key(kind, stage))? {
            Some(raw) => serde_json::from_str(&raw).with_context(|| {
                format!(
                    "Corrupt status record for {} {}",
                    kind.as_db_str(),
                    stage.as_str()
                )
            }),
            None => Ok(JobStatusRecord::idle()),
        }
    }

    /// Deletes every status record, typically once a caller has seen the
    /// pipeline through to completion.
    pub fn clear_all(&self) -> Result<()> {
        for kind in EntityKind::all() {
            for stage in JobStage::all() {
                self.store.delete(&Self::key(kind, stage))?;
            }
        }
        Ok(())
    }
}
