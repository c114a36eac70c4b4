//! First pipeline stage: align the local entry set with the remote catalog.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use crate::background::{BackgroundProcess, ProcessFlag, ProcessTask, TaskOutcome, WorkItem};
use crate::content::{field_table, EntityKind, SyncService};
use crate::satellite::{CatalogApi, ListQuery};

use super::import_job::ImportJob;
use super::status::{JobStage, JobStatusRecord, StatusStore};

/// Entry point that queues a sync run: one work item covering the whole
/// entity kind.
pub struct SyncJob {
    kind: EntityKind,
    process: Arc<BackgroundProcess>,
    status: StatusStore,
}

impl SyncJob {
    pub fn new(kind: EntityKind, process: Arc<BackgroundProcess>, status: StatusStore) -> Self {
        SyncJob {
            kind,
            process,
            status,
        }
    }

    pub async fn handle(&self) -> Result<()> {
        self.status
            .set(self.kind, JobStage::Sync, &JobStatusRecord::queued())?;
        self.process.push_to_queue(json!({}));
        self.process.save()?;
        self.process.dispatch().await?;
        Ok(())
    }
}

/// The queued side of the sync stage. Fetches the full id/name listing and
/// reconciles the local entry set against it, then hands over to the import
/// job on completion.
pub struct SyncTask {
    kind: EntityKind,
    api: Arc<dyn CatalogApi>,
    sync_service: Arc<SyncService>,
    status: StatusStore,
    next: Option<Arc<ImportJob>>,
}

impl SyncTask {
    pub fn new(
        kind: EntityKind,
        api: Arc<dyn CatalogApi>,
        sync_service: Arc<SyncService>,
        status: StatusStore,
        next: Option<Arc<ImportJob>>,
    ) -> Self {
        SyncTask {
            kind,
            api,
            sync_service,
            status,
            next,
        }
    }
}

#[async_trait]
impl ProcessTask for SyncTask {
    fn process_id(&self) -> &'static str {
        match self.kind {
            EntityKind::Brand => "brand_sync",
            EntityKind::Slot => "slot_sync",
        }
    }

    async fn task(&self, _item: WorkItem) -> Result<TaskOutcome> {
        let items = match self.api.get_options(self.kind, &ListQuery::default()).await {
            Ok(items) => items,
            Err(err) => {
                warn!(
                    "Options fetch for {} sync failed: {err:#}",
                    self.kind.as_db_str()
                );
                return Ok(TaskOutcome::Done);
            }
        };

        self.status.set(
            self.kind,
            JobStage::Sync,
            &JobStatusRecord::running(items.len() as u64, 0, 0),
        )?;
        self.sync_service
            .reconcile_all(&items, self.kind, field_table(self.kind))?;
        Ok(TaskOutcome::Done)
    }

    async fn on_complete(&self, _chain_id: Uuid, flag: Option<ProcessFlag>) -> Result<()> {
        self.status
            .set(self.kind, JobStage::Sync, &JobStatusRecord::completed())?;

        // a cancel or pause that landed during the final batch suppresses
        // the handover to the import stage
        if flag.is_none() {
            if let Some(next) = &self.next {
                next.handle().await?;
            }
        }
        Ok(())
    }
}
