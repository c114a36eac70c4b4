//! Job entry points and the pipeline wiring around the background engine.

mod import_job;
mod pipeline;
mod reset_job;
mod status;
mod sync_job;

pub use import_job::{ImportJob, ImportTask, DEFAULT_PER_PAGE};
pub use pipeline::{Pipeline, PipelineStatus};
pub use reset_job::{ResetJob, ResetTask};
pub use status::{JobStage, JobState, JobStatusRecord, StatusStore};
pub use sync_job::{SyncJob, SyncTask};
