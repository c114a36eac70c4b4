//! Second pipeline stage: page through the remote catalog and fill in the
//! meta fields of entries the sync stage created.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use crate::background::{BackgroundProcess, ProcessFlag, ProcessTask, TaskOutcome, WorkItem};
use crate::content::{field_table, ContentStore, EntityKind, SyncService};
use crate::satellite::{CatalogApi, ListQuery};

use super::status::{JobStage, JobStatusRecord, StatusStore};

pub const DEFAULT_PER_PAGE: u32 = 10;

/// Entry point that queues an import run: one work item per remote page,
/// sized from the local entry count.
pub struct ImportJob {
    kind: EntityKind,
    process: Arc<BackgroundProcess>,
    content: Arc<dyn ContentStore>,
    status: StatusStore,
    per_page: u32,
}

impl ImportJob {
    pub fn new(
        kind: EntityKind,
        process: Arc<BackgroundProcess>,
        content: Arc<dyn ContentStore>,
        status: StatusStore,
        per_page: u32,
    ) -> Self {
        ImportJob {
            kind,
            process,
            content,
            status,
            per_page,
        }
    }

    pub async fn handle(&self) -> Result<()> {
        self.status
            .set(self.kind, JobStage::Import, &JobStatusRecord::queued())?;

        let count = self.content.count_entries(self.kind)?;
        if count == 0 {
            warn!(
                "{} import skipped: no entries stored locally",
                self.kind.as_db_str()
            );
            self.status
                .set(self.kind, JobStage::Import, &JobStatusRecord::skipped())?;
            return Ok(());
        }

        let total_pages = count.div_ceil(self.per_page as u64);
        for page in 1..=total_pages {
            self.process
                .push_to_queue(json!({ "page": page, "total": total_pages }));
        }
        self.process.save()?;
        self.process.dispatch().await?;
        Ok(())
    }
}

/// The queued side of the import stage. Each work item names one remote
/// page; fetching it, upserting its records and advancing the progress
/// record happens per item.
pub struct ImportTask {
    kind: EntityKind,
    api: Arc<dyn CatalogApi>,
    sync_service: Arc<SyncService>,
    status: StatusStore,
    per_page: u32,
}

impl ImportTask {
    pub fn new(
        kind: EntityKind,
        api: Arc<dyn CatalogApi>,
        sync_service: Arc<SyncService>,
        status: StatusStore,
        per_page: u32,
    ) -> Self {
        ImportTask {
            kind,
            api,
            sync_service,
            status,
            per_page,
        }
    }
}

#[async_trait]
impl ProcessTask for ImportTask {
    fn process_id(&self) -> &'static str {
        match self.kind {
            EntityKind::Brand => "brand_import",
            EntityKind::Slot => "slot_import",
        }
    }

    async fn task(&self, item: WorkItem) -> Result<TaskOutcome> {
        let page = item.get("page").and_then(|v| v.as_u64()).unwrap_or(1);
        let total = item.get("total").and_then(|v| v.as_u64()).unwrap_or(0);

        let records = match self
            .api
            .get_page(self.kind, page as u32, self.per_page, &ListQuery::default())
            .await
        {
            Ok(response) => response.data,
            Err(err) => {
                warn!(
                    "Page {page} fetch for {} import failed: {err:#}",
                    self.kind.as_db_str()
                );
                Vec::new()
            }
        };

        self.sync_service
            .upsert_with_fields(&records, self.kind, field_table(self.kind))?;

        let percent = ((page as f64 / total.max(1) as f64) * 100.0).round() as u8;
        self.status.set(
            self.kind,
            JobStage::Import,
            &JobStatusRecord::running(total, page, percent),
        )?;
        Ok(TaskOutcome::Done)
    }

    async fn on_complete(&self, _chain_id: Uuid, _flag: Option<ProcessFlag>) -> Result<()> {
        self.status
            .set(self.kind, JobStage::Import, &JobStatusRecord::completed())?;
        Ok(())
    }
}
