//! Core types for the background-process engine.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Opaque, process-defined work payload (e.g. `{"page": 2, "total": 5}`).
pub type WorkItem = serde_json::Value;

/// A persisted unit of queued work.
///
/// Items are processed in insertion order and removed (or replaced, for
/// multi-pass items) one at a time; the batch row is rewritten after every
/// item so progress survives a crash mid-batch. The row is deleted once the
/// item list is empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub key: String,
    pub items: Vec<WorkItem>,
}

/// Result of processing a single work item.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    /// The item is finished and leaves the batch.
    Done,
    /// The item wants another pass; the replacement is persisted in its
    /// place and revisited on the next pass over the batch.
    Again(WorkItem),
}

/// Cooperative cancel/pause marker, read at item boundaries only. A running
/// drain is never preempted mid-item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessFlag {
    Cancelled,
    Paused,
}

impl ProcessFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessFlag::Cancelled => "cancelled",
            ProcessFlag::Paused => "paused",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "cancelled" => Some(ProcessFlag::Cancelled),
            "paused" => Some(ProcessFlag::Paused),
            _ => None,
        }
    }
}

/// Time-boxed drain lock. At most one non-expired lock exists per process
/// identifier; a holder that crashes is recovered through expiry, not
/// through proactive detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessLock {
    pub acquired_at: i64,
    pub ttl_secs: u64,
}

impl ProcessLock {
    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.acquired_at + self.ttl_secs as i64
    }
}

/// Engine tunables for one process.
///
/// The lock TTL must stay above the time budget, otherwise a healthy drain
/// can lose its lock mid-execution; `AppConfig` enforces that floor for
/// values coming from the outside.
#[derive(Debug, Clone)]
pub struct ProcessConfig {
    /// Wall-clock budget per execution, measured from lock acquisition.
    pub time_budget: Duration,
    /// Lifetime of the drain lock.
    pub lock_ttl: Duration,
    /// Sleep inserted after every processed item.
    pub throttle: Duration,
    /// Tick interval of the health-check schedule.
    pub healthcheck_interval: Duration,
    /// Resident-memory ceiling; the drain yields once usage crosses 90% of
    /// it. `None` disables the check.
    pub memory_ceiling_bytes: Option<u64>,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        ProcessConfig {
            time_budget: Duration::from_secs(20),
            lock_ttl: Duration::from_secs(60),
            throttle: Duration::ZERO,
            healthcheck_interval: Duration::from_secs(300),
            memory_ceiling_bytes: None,
        }
    }
}

/// Payload handed to the continuation port. Carries everything a fresh
/// execution context needs to re-enter the process: the target, the run it
/// belongs to and a single-use freshness token.
#[derive(Debug, Clone)]
pub struct Continuation {
    pub process_id: String,
    pub chain_id: Uuid,
    pub token: String,
}

/// What `dispatch()` did. None of these are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Continuation handed to the transport.
    Dispatched,
    /// A drain currently holds the lock; duplicate triggers are dropped.
    AlreadyRunning,
    /// The task vetoed the dispatch.
    Vetoed,
    /// The transport refused the continuation. Non-fatal: the health-check
    /// schedule re-dispatches on its next tick.
    Dropped,
}

/// How an inbound trigger was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// Freshness token missing, stale or already used.
    Unauthorized,
    /// Another execution holds the lock.
    Busy,
    /// Cancellation observed, queue and state torn down.
    Cancelled,
    /// Pause observed, schedule disarmed, queue left intact.
    Paused,
    /// Nothing queued.
    Empty,
    /// A drain ran.
    Handled,
}
