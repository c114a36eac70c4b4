//! The background-process engine.
//!
//! A [`BackgroundProcess`] drains its durable queue in short, time-boxed
//! executions. Each execution acquires the drain lock, processes items until
//! the time budget, memory ceiling or a cancel/pause flag stops it, then
//! releases the lock and either schedules a continuation (work left) or
//! completes (queue empty). Nothing here assumes the next execution happens
//! in the same task, or even in the same process lifetime: all state that
//! matters is in the key/value store.

use crate::background::dispatch::Dispatcher;
use crate::background::healthcheck::{HealthcheckSchedule, HealthcheckTick};
use crate::background::models::{
    Continuation, DispatchOutcome, ProcessConfig, ProcessFlag, TaskOutcome, TriggerOutcome,
    WorkItem,
};
use crate::background::queue::ProcessQueue;
use crate::background::task::ProcessTask;
use crate::background::trigger_auth::TriggerAuth;
use crate::kv_store::KvStore;
use anyhow::Result;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[cfg(target_os = "linux")]
fn resident_memory_bytes() -> Option<u64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    let vmrss = status.lines().find(|line| line.starts_with("VmRSS:"))?;
    let kb: u64 = vmrss.split_whitespace().nth(1)?.parse().ok()?;
    Some(kb * 1024)
}

#[cfg(not(target_os = "linux"))]
fn resident_memory_bytes() -> Option<u64> {
    None
}

pub struct BackgroundProcess {
    task: Arc<dyn ProcessTask>,
    queue: ProcessQueue,
    dispatcher: Arc<dyn Dispatcher>,
    auth: Arc<TriggerAuth>,
    healthcheck: HealthcheckSchedule,
    config: ProcessConfig,
    staged: Mutex<Vec<WorkItem>>,
    chain: Mutex<Option<Uuid>>,
}

impl BackgroundProcess {
    pub fn new(
        task: Arc<dyn ProcessTask>,
        store: Arc<dyn KvStore>,
        dispatcher: Arc<dyn Dispatcher>,
        auth: Arc<TriggerAuth>,
        config: ProcessConfig,
    ) -> Self {
        let queue = ProcessQueue::new(store, task.process_id());
        let healthcheck = HealthcheckSchedule::new(config.healthcheck_interval);
        BackgroundProcess {
            task,
            queue,
            dispatcher,
            auth,
            healthcheck,
            config,
            staged: Mutex::new(Vec::new()),
            chain: Mutex::new(None),
        }
    }

    pub fn process_id(&self) -> &'static str {
        self.task.process_id()
    }

    pub fn queue(&self) -> &ProcessQueue {
        &self.queue
    }

    /// Stages an item in memory. Nothing is persisted until [`save`].
    ///
    /// [`save`]: BackgroundProcess::save
    pub fn push_to_queue(&self, item: WorkItem) {
        self.staged.lock().unwrap().push(item);
    }

    /// Persists all staged items as one batch. A call with nothing staged is
    /// a no-op.
    pub fn save(&self) -> Result<()> {
        let staged: Vec<WorkItem> = std::mem::take(&mut *self.staged.lock().unwrap());
        if staged.is_empty() {
            return Ok(());
        }
        let key = self.queue.save_new_batch(&staged)?;
        debug!(
            "Process {} saved batch {key} with {} items",
            self.process_id(),
            staged.len()
        );
        Ok(())
    }

    /// Schedules a continuation for this process. Duplicate triggers while a
    /// drain is running are refused, not queued.
    pub async fn dispatch(self: &Arc<Self>) -> Result<DispatchOutcome> {
        if self.queue.is_locked()? {
            debug!(
                "Process {} already holds its drain lock, not dispatching",
                self.process_id()
            );
            return Ok(DispatchOutcome::AlreadyRunning);
        }
        let chain_id = self.current_chain();
        if self.task.veto_dispatch(chain_id) {
            debug!("Process {} vetoed its own dispatch", self.process_id());
            return Ok(DispatchOutcome::Vetoed);
        }
        self.healthcheck.arm(self.clone());
        let continuation = Continuation {
            process_id: self.process_id().to_string(),
            chain_id,
            token: self.auth.issue(self.process_id()),
        };
        match self.dispatcher.dispatch(continuation).await {
            Ok(()) => Ok(DispatchOutcome::Dispatched),
            Err(err) => {
                // the armed health check re-dispatches on its next tick
                warn!("Process {} continuation dropped: {err}", self.process_id());
                Ok(DispatchOutcome::Dropped)
            }
        }
    }

    /// Entry point for an inbound trigger. Verifies the freshness token,
    /// then resolves the process state: running drains win, a cancel flag
    /// tears everything down, a pause flag parks the process, and otherwise
    /// a drain starts.
    pub async fn maybe_handle(
        self: &Arc<Self>,
        token: &str,
        chain_id: Option<Uuid>,
    ) -> Result<TriggerOutcome> {
        if !self.auth.verify(self.process_id(), token) {
            debug!(
                "Rejected trigger for {} with stale or replayed token",
                self.process_id()
            );
            return Ok(TriggerOutcome::Unauthorized);
        }
        if let Some(chain_id) = chain_id {
            self.adopt_chain(chain_id);
        }
        if self.queue.is_locked()? {
            return Ok(TriggerOutcome::Busy);
        }
        match self.queue.flag()? {
            Some(ProcessFlag::Cancelled) => {
                self.healthcheck.disarm();
                self.queue.unlock()?;
                self.delete_all()?;
                let chain_id = self.end_chain();
                info!(
                    "Process {} cancelled, queue dropped (chain {chain_id})",
                    self.process_id()
                );
                Ok(TriggerOutcome::Cancelled)
            }
            Some(ProcessFlag::Paused) => {
                self.healthcheck.disarm();
                self.task.on_paused(self.current_chain());
                info!("Process {} paused", self.process_id());
                Ok(TriggerOutcome::Paused)
            }
            None => {
                if self.queue.is_empty()? {
                    return Ok(TriggerOutcome::Empty);
                }
                self.handle().await?;
                Ok(TriggerOutcome::Handled)
            }
        }
    }

    /// One drain execution. A task fault propagates with the lock still
    /// held; recovery happens through lock expiry and the health check.
    async fn handle(self: &Arc<Self>) -> Result<()> {
        if !self.queue.try_lock(self.config.lock_ttl)? {
            return Ok(());
        }
        let started = Instant::now();
        debug!("Process {} drain started", self.process_id());
        loop {
            let Some(mut batch) = self.queue.first_batch()? else {
                break;
            };
            let mut index = 0;
            while index < batch.items.len() {
                let item = batch.items[index].clone();
                match self.task.task(item).await? {
                    TaskOutcome::Done => {
                        batch.items.remove(index);
                    }
                    TaskOutcome::Again(replacement) => {
                        batch.items[index] = replacement;
                        index += 1;
                    }
                }
                // persist progress after every item
                if batch.items.is_empty() {
                    self.queue.delete_batch(&batch.key)?;
                } else {
                    self.queue.update_batch(&batch)?;
                }
                if !self.config.throttle.is_zero() {
                    tokio::time::sleep(self.config.throttle).await;
                }
                if !self.should_continue(started)? {
                    break;
                }
            }
            if self.queue.is_empty()? || !self.should_continue(started)? {
                break;
            }
        }
        self.queue.unlock()?;
        if self.queue.is_empty()? {
            self.complete().await
        } else {
            self.dispatch().await?;
            Ok(())
        }
    }

    fn should_continue(&self, started: Instant) -> Result<bool> {
        if started.elapsed() >= self.config.time_budget {
            debug!("Process {} time budget exhausted", self.process_id());
            return Ok(false);
        }
        if self.memory_exceeded() {
            warn!(
                "Process {} near its memory ceiling, yielding",
                self.process_id()
            );
            return Ok(false);
        }
        Ok(self.queue.flag()?.is_none())
    }

    fn memory_exceeded(&self) -> bool {
        let Some(ceiling) = self.config.memory_ceiling_bytes else {
            return false;
        };
        match resident_memory_bytes() {
            Some(resident) => resident as f64 >= ceiling as f64 * 0.9,
            None => false,
        }
    }

    /// Ends the chain: reads the cancel/pause state observed during the
    /// final pass, clears it, disarms the health check and hands both to the
    /// completion callback.
    async fn complete(&self) -> Result<()> {
        let flag = self.queue.flag()?;
        self.queue.clear_flag()?;
        self.healthcheck.disarm();
        let chain_id = self.end_chain();
        info!("Process {} completed (chain {chain_id})", self.process_id());
        self.task.on_complete(chain_id, flag).await
    }

    /// Flags the process as cancelled and wakes it so an idle or paused
    /// process tears down promptly instead of waiting for the next tick.
    pub async fn cancel(self: &Arc<Self>) -> Result<()> {
        self.queue.set_flag(ProcessFlag::Cancelled)?;
        self.dispatch().await?;
        Ok(())
    }

    /// Flags the process as paused. A running drain stops at the next item
    /// boundary; the queue stays intact.
    pub fn pause(&self) -> Result<()> {
        self.queue.set_flag(ProcessFlag::Paused)
    }

    /// Clears the pause flag and re-dispatches.
    pub async fn resume(self: &Arc<Self>) -> Result<DispatchOutcome> {
        self.queue.clear_flag()?;
        self.task.on_resumed(self.current_chain());
        self.dispatch().await
    }

    /// Removes every queued batch and the status flag, then notifies the
    /// task that the process was torn down.
    pub fn delete_all(&self) -> Result<()> {
        self.queue.delete_all_batches()?;
        self.queue.clear_flag()?;
        self.task.on_cancelled(self.current_chain());
        Ok(())
    }

    /// One health-check evaluation: a held lock means the process is fine, an
    /// empty queue means the schedule can stop, anything else means a trigger
    /// went missing.
    pub(crate) async fn healthcheck_tick(self: &Arc<Self>) -> Result<HealthcheckTick> {
        if self.queue.is_locked()? {
            return Ok(HealthcheckTick::Active);
        }
        if self.queue.is_empty()? {
            self.healthcheck.disarm();
            return Ok(HealthcheckTick::Disarmed);
        }
        info!(
            "Health check found {} unlocked with work queued, re-dispatching",
            self.process_id()
        );
        self.dispatch().await?;
        Ok(HealthcheckTick::Redispatched)
    }

    fn current_chain(&self) -> Uuid {
        *self
            .chain
            .lock()
            .unwrap()
            .get_or_insert_with(Uuid::new_v4)
    }

    fn adopt_chain(&self, chain_id: Uuid) {
        *self.chain.lock().unwrap() = Some(chain_id);
    }

    fn end_chain(&self) -> Uuid {
        self.chain
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(Uuid::new_v4)
    }
}
