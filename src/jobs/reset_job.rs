//! One-shot job wiping every locally stored entry.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use crate::background::{BackgroundProcess, ProcessTask, TaskOutcome, WorkItem};
use crate::content::{EntityKind, SyncService};

pub struct ResetJob {
    process: Arc<BackgroundProcess>,
}

impl ResetJob {
    pub fn new(process: Arc<BackgroundProcess>) -> Self {
        ResetJob { process }
    }

    pub async fn handle(&self) -> Result<()> {
        self.process.push_to_queue(json!({}));
        self.process.save()?;
        self.process.dispatch().await?;
        Ok(())
    }
}

/// Deletes every brand and slot entry in a single queued task. No progress
/// record is kept for resets.
pub struct ResetTask {
    sync_service: Arc<SyncService>,
}

impl ResetTask {
    pub fn new(sync_service: Arc<SyncService>) -> Self {
        ResetTask { sync_service }
    }
}

#[async_trait]
impl ProcessTask for ResetTask {
    fn process_id(&self) -> &'static str {
        "reset_all_data"
    }

    async fn task(&self, _item: WorkItem) -> Result<TaskOutcome> {
        let removed = self.sync_service.delete_all(&EntityKind::all())?;
        info!("Reset removed {removed} entries");
        Ok(TaskOutcome::Done)
    }
}
