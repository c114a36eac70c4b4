//! Wiring for the entity pipelines and the operations callers drive them
//! with.

use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;

use crate::background::{
    BackgroundProcess, Dispatcher, ProcessConfig, ProcessRegistry, TriggerAuth,
};
use crate::content::{ContentStore, EntityKind, SyncService};
use crate::kv_store::KvStore;
use crate::satellite::CatalogApi;

use super::import_job::{ImportJob, ImportTask};
use super::reset_job::{ResetJob, ResetTask};
use super::status::{JobStage, JobStatusRecord, StatusStore};
use super::sync_job::{SyncJob, SyncTask};

/// Snapshot of every stage's status record.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStatus {
    pub brand_sync: JobStatusRecord,
    pub brand_import: JobStatusRecord,
    pub slot_sync: JobStatusRecord,
    pub slot_import: JobStatusRecord,
}

/// Both entity pipelines plus the reset job, sharing one dispatcher, one
/// token issuer and one process registry.
///
/// Each pipeline is two chained processes: the sync stage reconciles the
/// entry set from the options listing, then its completion queues the import
/// stage, which pages through full records and fills in meta fields.
pub struct Pipeline {
    registry: Arc<ProcessRegistry>,
    brand_sync: Arc<SyncJob>,
    slot_sync: Arc<SyncJob>,
    reset: Arc<ResetJob>,
    status: StatusStore,
}

impl Pipeline {
    pub fn new(
        kv: Arc<dyn KvStore>,
        content: Arc<dyn ContentStore>,
        api: Arc<dyn CatalogApi>,
        dispatcher: Arc<dyn Dispatcher>,
        auth: Arc<TriggerAuth>,
        process_config: ProcessConfig,
        per_page: u32,
    ) -> Self {
        let status = StatusStore::new(kv.clone());
        let sync_service = Arc::new(SyncService::new(content.clone()));
        let mut registry = ProcessRegistry::new();

        let brand_sync = build_entity_pipeline(
            EntityKind::Brand,
            &kv,
            &content,
            &api,
            &sync_service,
            &dispatcher,
            &auth,
            &status,
            &process_config,
            per_page,
            &mut registry,
        );
        let slot_sync = build_entity_pipeline(
            EntityKind::Slot,
            &kv,
            &content,
            &api,
            &sync_service,
            &dispatcher,
            &auth,
            &status,
            &process_config,
            per_page,
            &mut registry,
        );

        let reset_task = Arc::new(ResetTask::new(sync_service));
        let reset_process = Arc::new(BackgroundProcess::new(
            reset_task,
            kv,
            dispatcher,
            auth,
            process_config,
        ));
        registry.register(reset_process.clone());
        let reset = Arc::new(ResetJob::new(reset_process));

        Pipeline {
            registry: Arc::new(registry),
            brand_sync,
            slot_sync,
            reset,
            status,
        }
    }

    /// Every registered process, for the trigger route and the continuation
    /// runner.
    pub fn registry(&self) -> Arc<ProcessRegistry> {
        self.registry.clone()
    }

    /// Starts both entity pipelines at their sync stage.
    pub async fn run_import(&self) -> Result<()> {
        self.brand_sync.handle().await?;
        self.slot_sync.handle().await?;
        Ok(())
    }

    /// Queues the job that wipes all locally stored entries.
    pub async fn reset_data(&self) -> Result<()> {
        self.reset.handle().await
    }

    pub fn get_status(&self) -> Result<PipelineStatus> {
        Ok(PipelineStatus {
            brand_sync: self.status.get(EntityKind::Brand, JobStage::Sync)?,
            brand_import: self.status.get(EntityKind::Brand, JobStage::Import)?,
            slot_sync: self.status.get(EntityKind::Slot, JobStage::Sync)?,
            slot_import: self.status.get(EntityKind::Slot, JobStage::Import)?,
        })
    }

    pub fn clear_status(&self) -> Result<()> {
        self.status.clear_all()
    }
}

#[allow(clippy::too_many_arguments)]
fn build_entity_pipeline(
    kind: EntityKind,
    kv: &Arc<dyn KvStore>,
    content: &Arc<dyn ContentStore>,
    api: &Arc<dyn CatalogApi>,
    sync_service: &Arc<SyncService>,
    dispatcher: &Arc<dyn Dispatcher>,
    auth: &Arc<TriggerAuth>,
    status: &StatusStore,
    process_config: &ProcessConfig,
    per_page: u32,
    registry: &mut ProcessRegistry,
) -> Arc<SyncJob> {
    let import_task = Arc::new(ImportTask::new(
        kind,
        api.clone(),
        sync_service.clone(),
        status.clone(),
        per_page,
    ));
    let import_process = Arc::new(BackgroundProcess::new(
        import_task,
        kv.clone(),
        dispatcher.clone(),
        auth.clone(),
        process_config.clone(),
    ));
    registry.register(import_process.clone());
    let import_job = Arc::new(ImportJob::new(
        kind,
        import_process,
        content.clone(),
        status.clone(),
        per_page,
    ));

    let sync_task = Arc::new(SyncTask::new(
        kind,
        api.clone(),
        sync_service.clone(),
        status.clone(),
        Some(import_job),
    ));
    let sync_process = Arc::new(BackgroundProcess::new(
        sync_task,
        kv.clone(),
        dispatcher.clone(),
        auth.clone(),
        process_config.clone(),
    ));
    registry.register(sync_process.clone());
    Arc::new(SyncJob::new(kind, sync_process, status.clone()))
}
