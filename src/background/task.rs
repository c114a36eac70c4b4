use crate::background::models::{ProcessFlag, TaskOutcome, WorkItem};
use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

/// The work a [`BackgroundProcess`](crate::background::BackgroundProcess)
/// drains. Implementations define what a work item means and what happens
/// around the process lifecycle; the engine owns queueing, locking, budget
/// and flag handling.
#[async_trait]
pub trait ProcessTask: Send + Sync {
    /// Stable identifier, namespace for every key this process persists.
    fn process_id(&self) -> &'static str;

    /// Processes one work item. Returning an error aborts the drain and
    /// leaves the lock in place until its TTL expires.
    async fn task(&self, item: WorkItem) -> Result<TaskOutcome>;

    /// Called once per chain after the queue fully drained. `flag` is the
    /// cancel/pause state observed at completion time, before teardown, so
    /// implementations can skip follow-up work for interrupted runs.
    async fn on_complete(&self, chain_id: Uuid, flag: Option<ProcessFlag>) -> Result<()> {
        let _ = (chain_id, flag);
        Ok(())
    }

    /// Called after a cancellation teardown removed the queue.
    fn on_cancelled(&self, chain_id: Uuid) {
        let _ = chain_id;
    }

    fn on_paused(&self, chain_id: Uuid) {
        let _ = chain_id;
    }

    fn on_resumed(&self, chain_id: Uuid) {
        let _ = chain_id;
    }

    /// Last-moment veto for outbound dispatches, checked while the trigger
    /// is being prepared.
    fn veto_dispatch(&self, chain_id: Uuid) -> bool {
        let _ = chain_id;
        false
    }
}
